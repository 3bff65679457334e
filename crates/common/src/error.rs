//! Error types for Portgate
//!
//! Every variant maps onto the HTTP status the handlers answer with.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidRange(String),

    /// Deliberately carries no detail: callers must not learn which
    /// addresses a host resolved to or why it was rejected.
    #[error("host not allowed")]
    Forbidden,

    #[error("missing or invalid API key")]
    Unauthorized,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("not found")]
    NotFound,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("configuration error: {0}")]
    Config(String),
}

impl GateError {
    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            GateError::Validation(_) | GateError::InvalidRange(_) => 400,
            GateError::Unauthorized => 401,
            GateError::Forbidden => 403,
            GateError::NotFound => 404,
            GateError::MethodNotAllowed => 405,
            GateError::RateLimited => 429,
            GateError::Config(_) => 500,
        }
    }

    /// Short machine-readable kind, used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            GateError::Validation(_) => "validation-error",
            GateError::InvalidRange(_) => "invalid-range",
            GateError::Forbidden => "authorization-denied",
            GateError::Unauthorized => "unauthorized",
            GateError::RateLimited => "rate-limited",
            GateError::NotFound => "not-found",
            GateError::MethodNotAllowed => "method-not-allowed",
            GateError::Config(_) => "config",
        }
    }
}

/// Result type alias for Portgate operations
pub type GateResult<T> = Result<T, GateError>;
