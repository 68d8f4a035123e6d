#![allow(dead_code)]

pub use workgraph_test_utils::init_tracing;
