//! HTTP server
//!
//! Request handlers for the page permission API.

pub mod handler;

pub use handler::{AppState, router};
