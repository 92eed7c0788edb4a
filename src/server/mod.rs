//! HTTP server for Tinymind

pub mod http;

pub use http::{run, AppState};
