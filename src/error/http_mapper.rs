//! HTTP error mapping.
//!
//! Maps application errors to HTTP responses with a JSON body of the form
//! `{ "message": ..., "error_type": ..., ...details }`.
//!
//! # Strategy
//! - Caller mistakes (bad shape, duplicate, escalation) → 400
//! - Missing page or permission → 404
//! - Missing or malformed caller identity → 401
//! - Space ability denial → 403
//! - Storage or directory faults → 500 with a generic message; the detail is
//!   logged here and never returned

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value, json};
use std::borrow::Cow;
use tracing::error;

use super::{AuthError, DirectoryError, GrantError, StoreError};

/// An error ready to be sent over HTTP
#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    pub message: Cow<'static, str>,
    pub error_type: &'static str,
    pub data: Map<String, Value>,
}

impl HttpError {
    fn new(status: StatusCode, error_type: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status,
            message: message.into(),
            error_type,
            data: Map::new(),
        }
    }

    fn with(mut self, key: &str, value: Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    /// Log the cause and hide it from the caller
    fn internal(cause: &dyn std::fmt::Display) -> Self {
        error!("Internal error: {}", cause);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "InternalError",
            "Internal server error",
        )
    }

    /// Body as sent to the caller
    pub fn body(&self) -> Value {
        let mut body = self.data.clone();
        body.insert("message".to_string(), json!(self.message));
        body.insert("error_type".to_string(), json!(self.error_type));
        Value::Object(body)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}

/// Maps a `GrantError` to an HTTP error.
pub fn map_grant_error(error: &GrantError) -> HttpError {
    match error {
        GrantError::PageNotFound => {
            HttpError::new(StatusCode::NOT_FOUND, "PageNotFound", error.to_string())
        }

        GrantError::PermissionNotFound => HttpError::new(
            StatusCode::NOT_FOUND,
            "PermissionNotFound",
            error.to_string(),
        ),

        GrantError::InvalidGrantShape { reason } => HttpError::new(
            StatusCode::BAD_REQUEST,
            "InvalidGrantShape",
            error.to_string(),
        )
        .with("reason", json!(reason)),

        GrantError::DuplicateGrant => {
            HttpError::new(StatusCode::BAD_REQUEST, "DuplicateGrant", error.to_string())
        }

        GrantError::RoleEscalation { requested, cap } => HttpError::new(
            StatusCode::BAD_REQUEST,
            "RoleEscalation",
            error.to_string(),
        )
        .with("requested", json!(requested))
        .with("cap", json!(cap)),

        GrantError::EmptyBatch => {
            HttpError::new(StatusCode::BAD_REQUEST, "EmptyBatch", error.to_string())
        }

        GrantError::BatchTooLarge { kind, len, max } => HttpError::new(
            StatusCode::BAD_REQUEST,
            "BatchTooLarge",
            error.to_string(),
        )
        .with("kind", json!(kind.as_str()))
        .with("len", json!(len))
        .with("max", json!(max)),

        GrantError::Store(e) => HttpError::internal(e),

        GrantError::Directory(e) => HttpError::internal(e),
    }
}

/// Maps an `AuthError` to an HTTP error.
pub fn map_auth_error(error: &AuthError) -> HttpError {
    match error {
        AuthError::MissingIdentity => HttpError::new(
            StatusCode::UNAUTHORIZED,
            "MissingIdentity",
            error.to_string(),
        ),

        AuthError::InvalidIdentity(_) => HttpError::new(
            StatusCode::UNAUTHORIZED,
            "InvalidIdentity",
            error.to_string(),
        ),

        AuthError::Forbidden { action, subject } => {
            HttpError::new(StatusCode::FORBIDDEN, "Forbidden", error.to_string())
                .with("action", json!(action))
                .with("subject", json!(subject))
        }

        AuthError::Directory(e) => HttpError::internal(e),
    }
}

impl From<GrantError> for HttpError {
    fn from(error: GrantError) -> Self {
        map_grant_error(&error)
    }
}

impl From<AuthError> for HttpError {
    fn from(error: AuthError) -> Self {
        map_auth_error(&error)
    }
}

impl From<StoreError> for HttpError {
    fn from(error: StoreError) -> Self {
        HttpError::internal(&error)
    }
}

impl From<DirectoryError> for HttpError {
    fn from(error: DirectoryError) -> Self {
        HttpError::internal(&error)
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        HttpError::new(
            StatusCode::BAD_REQUEST,
            "InvalidRequest",
            rejection.body_text(),
        )
    }
}

impl IntoResponse for GrantError {
    fn into_response(self) -> Response {
        map_grant_error(&self).into_response()
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        map_auth_error(&self).into_response()
    }
}
