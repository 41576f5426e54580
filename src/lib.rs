//! Page-level permission engine
//!
//! Restricts access to individual pages inside a space by granting roles to
//! users and groups, without ever exceeding what those principals already
//! hold in the space.
//!
//! ## Features
//!
//! - **Role lattice** `reader < writer < admin`, compared by rank, never by string
//! - **Single and batch grants** with duplicate and escalation checks
//! - **Effective access** combining direct and group grants
//! - **HTTP API** gated by space-level abilities
//! - **Flexible configuration** via TOML files and environment variables
//!
//! ## Grant Pipeline
//!
//! ```text
//! page exists → target shape → not already granted → role ≤ space role → insert
//! ```
//!
//! The store's unique indexes back the "not already granted" check, so two
//! racing grants for the same principal cannot both succeed.
//!
//! ## Example Configuration
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 20290
//!
//! [database]
//! url = "sqlite://pagewarden.db"
//!
//! [grants]
//! max_batch_size = 25
//! ```

pub mod access_control;
pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod server;
pub mod service;
pub mod store;
pub mod transport;

// Re-export main types
pub use access_control::{AccessResolver, Role};
pub use config::{AppConfig, load_config};
pub use error::{AppError, GrantError, Result};
pub use server::AppState;
pub use service::{BatchGrantService, BatchOutcome, GrantService};
