// file: src/exporter/mod.rs
// description: report export module exports

pub mod json;

pub use json::{JsonExporter, append_json_lines};
