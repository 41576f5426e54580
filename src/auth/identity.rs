//! Caller identity
//!
//! The service sits behind an authenticating proxy that forwards the
//! authenticated user's id in a header. Requests without it are rejected.

use crate::access_control::UserId;
use crate::error::AuthError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Header carrying the authenticated user's id
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

impl AuthUser {
    pub fn from_header(value: Option<&str>) -> Result<Self, AuthError> {
        let value = value.map(str::trim).filter(|v| !v.is_empty());
        let Some(value) = value else {
            return Err(AuthError::MissingIdentity);
        };
        value
            .parse()
            .map(AuthUser)
            .map_err(|e: uuid::Error| AuthError::InvalidIdentity(e.to_string()))
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = match parts.headers.get(USER_ID_HEADER) {
            Some(v) => Some(
                v.to_str()
                    .map_err(|e| AuthError::InvalidIdentity(e.to_string()))?,
            ),
            None => None,
        };
        Self::from_header(value)
    }
}
