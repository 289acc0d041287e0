//! Domain error taxonomy.
//!
//! Authorization failures are decided before any external call and
//! returned immediately. External-call failures are converted into this
//! taxonomy at the boundary instead of leaking transport errors.
//! `DecryptionFailed` is soft: it is logged and replaced with default
//! empty content, never surfaced to the caller as a hard error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    pub fn not_authorized(msg: impl Into<String>) -> Self {
        Self::NotAuthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationFailed(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(msg.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
