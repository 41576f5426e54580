//! Transport module
//!
//! Provides the HTTP transport for the permission API.

pub mod http;

pub use http::{DEFAULT_HTTP_PORT, HttpConfig, build_app, run_http, run_http_blocking};
