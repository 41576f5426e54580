//! Error types for pagewarden
//!
//! This module defines the error hierarchy used throughout the application.
//! We use `thiserror` for library-style errors that are part of the API,
//! and convert to HTTP responses at the transport boundary (see [`http_mapper`]).

pub mod http_mapper;

use crate::access_control::{PrincipalKind, Role};
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Grant error: {0}")]
    Grant(#[from] GrantError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a [`PermissionStore`](crate::store::PermissionStore)
#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("Conflicting grant already exists ({constraint})")]
    Conflict { constraint: String },

    /// A CHECK constraint rejected the write
    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    /// A stored row exists but cannot be decoded
    #[error("Corrupt row in {table}: {reason}")]
    Corrupt { table: &'static str, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn corrupt(table: &'static str, reason: impl Into<String>) -> Self {
        StoreError::Corrupt {
            table,
            reason: reason.into(),
        }
    }
}

/// Errors raised by the page and space-membership collaborators
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Corrupt row in {table}: {reason}")]
    Corrupt { table: &'static str, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl DirectoryError {
    pub fn corrupt(table: &'static str, reason: impl Into<String>) -> Self {
        DirectoryError::Corrupt {
            table,
            reason: reason.into(),
        }
    }
}

/// Failures of the grant pipelines.
///
/// Every variant except [`GrantError::Store`] and [`GrantError::Directory`]
/// is a caller-facing, recoverable condition.
#[derive(Error, Debug)]
pub enum GrantError {
    #[error("Page not found")]
    PageNotFound,

    #[error("Permission not found")]
    PermissionNotFound,

    #[error("Invalid grant: {reason}")]
    InvalidGrantShape { reason: &'static str },

    #[error("Permission already exists")]
    DuplicateGrant,

    #[error("Page role '{requested}' cannot exceed existing space role '{cap}'")]
    RoleEscalation { requested: Role, cap: Role },

    #[error("Either userIds or groupIds must be provided")]
    EmptyBatch,

    #[error("Too many {kind} ids in one batch: {len} (max {max})")]
    BatchTooLarge {
        kind: PrincipalKind,
        len: usize,
        max: usize,
    },

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl GrantError {
    /// Whether this error is an internal fault rather than a caller mistake
    pub fn is_internal(&self) -> bool {
        matches!(self, GrantError::Store(_) | GrantError::Directory(_))
    }

    pub fn neither_principal() -> Self {
        GrantError::InvalidGrantShape {
            reason: "either userId or groupId must be provided",
        }
    }

    pub fn both_principals() -> Self {
        GrantError::InvalidGrantShape {
            reason: "only one of userId or groupId can be provided",
        }
    }
}

impl From<StoreError> for GrantError {
    /// Storage constraint rejections become the caller-facing kinds the
    /// pre-checks would have produced.
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict { .. } => GrantError::DuplicateGrant,
            StoreError::ConstraintViolation(_) => GrantError::both_principals(),
            other => GrantError::Store(other),
        }
    }
}

/// Caller identity and space-ability errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing caller identity")]
    MissingIdentity,

    #[error("Invalid caller identity: {0}")]
    InvalidIdentity(String),

    #[error("Forbidden: cannot {action} {subject}")]
    Forbidden {
        action: &'static str,
        subject: &'static str,
    },

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Transport layer errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid bind address: {0}")]
    Bind(#[from] std::net::AddrParseError),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for grant operations
pub type GrantResult<T> = std::result::Result<T, GrantError>;

/// Result type alias for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
