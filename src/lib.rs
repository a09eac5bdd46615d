// src/lib.rs
pub mod aggregate;
pub mod config;
pub mod discovery;
pub mod error;
pub mod forward;
pub mod gateway;
pub mod metrics;
pub mod registry;
pub mod selector;
pub mod server;
