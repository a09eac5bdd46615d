// src/server/mod.rs
pub mod builder;
pub mod handler;

pub use builder::ServerBuilder;
pub use handler::RequestHandler;
