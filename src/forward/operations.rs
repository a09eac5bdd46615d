// src/forward/operations.rs
use hyper::Method;

/// One entry of the static name -> backend path table.
///
/// The table is part of the wire contract and identical for every
/// backend; operations are never discovered per instance.
#[derive(Debug)]
pub struct Operation {
    pub name: &'static str,
    pub method: Method,
    pub path: &'static str,
}

pub static OPERATIONS: &[Operation] = &[
    Operation { name: "status", method: Method::GET, path: "status" },
    Operation { name: "overview", method: Method::GET, path: "overview" },
    Operation { name: "binary", method: Method::GET, path: "binary" },
    Operation { name: "binary_info", method: Method::GET, path: "binary/info" },
    Operation { name: "methods", method: Method::GET, path: "methods" },
    Operation { name: "classes", method: Method::GET, path: "classes" },
    Operation { name: "segments", method: Method::GET, path: "segments" },
    Operation { name: "imports", method: Method::GET, path: "imports" },
    Operation { name: "exports", method: Method::GET, path: "exports" },
    Operation { name: "namespaces", method: Method::GET, path: "namespaces" },
    Operation { name: "data", method: Method::GET, path: "data" },
    Operation { name: "data_item", method: Method::GET, path: "data/item" },
    Operation { name: "data_references", method: Method::GET, path: "data/references" },
    Operation { name: "memory", method: Method::GET, path: "memory" },
    Operation { name: "search_functions", method: Method::GET, path: "searchFunctions" },
    Operation { name: "decompile", method: Method::POST, path: "decompile" },
];

pub fn lookup_operation(name: &str) -> Option<&'static Operation> {
    OPERATIONS.iter().find(|op| op.name == name)
}
