// src/ingest/providers/mod.rs
pub mod http_json;
pub mod json_file;

pub use http_json::HttpJsonProvider;
pub use json_file::JsonFileProvider;
