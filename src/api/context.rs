//! Caller identity extraction.
//!
//! The dashboard sits behind a front layer that authenticates the user
//! and forwards the identity in the `x-user-id` and `x-username`
//! headers. Both must be present; requests without them are rejected
//! before any handler logic runs.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::api::error::ApiError;
use crate::error::CoreError;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_id: String,
    pub username: String,
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_value(parts, "x-user-id");
        let username = header_value(parts, "x-username");

        match (user_id, username) {
            (Some(user_id), Some(username)) => Ok(Self { user_id, username }),
            _ => Err(ApiError::from(CoreError::AuthenticationRequired)),
        }
    }
}
