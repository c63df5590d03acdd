//! Token workflow error types.
//!
//! Every business error is recoverable and reportable. The only fatal
//! condition, an incomplete policy table, has its own type so it can only
//! surface where the table is built.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::token::types::{TokenStatus, TokenType};

/// Errors that can occur during token workflow operations.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The action is not legal from the token's current status.
    #[error("Cannot {action} a token in status {from}")]
    InvalidTransition {
        /// The current status.
        from: TokenStatus,
        /// The attempted action.
        action: &'static str,
    },

    /// The actor lacks the authority required by the current step.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Structural input defect.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// The token is approved but the current time is outside its window.
    #[error("Token is only valid from {valid_from} until {valid_until} (now {at})")]
    OutOfValidityWindow {
        /// Start of the window.
        valid_from: DateTime<Utc>,
        /// End of the window.
        valid_until: DateTime<Utc>,
        /// Time of the attempt.
        at: DateTime<Utc>,
    },

    /// A concurrent write committed first.
    #[error("Token {0} was modified concurrently, reload and retry")]
    Conflict(Uuid),

    /// Token not found.
    #[error("Token {0} not found")]
    NotFound(String),

    /// Persistence failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl TokenError {
    /// Shorthand for an invalid transition.
    #[must_use]
    pub const fn invalid(from: TokenStatus, action: &'static str) -> Self {
        Self::InvalidTransition { from, action }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::ValidationFailed(_) => 400,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::InvalidTransition { .. } => 409,
            Self::Conflict(_) => 412,
            Self::OutOfValidityWindow { .. } => 422,
            Self::Storage(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::ValidationFailed(_) => "VALIDATION_FAILED",
            Self::OutOfValidityWindow { .. } => "OUT_OF_VALIDITY_WINDOW",
            Self::Conflict(_) => "CONFLICT",
            Self::NotFound(_) => "TOKEN_NOT_FOUND",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}

/// Fatal configuration error raised while building the policy table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyConfigError {
    /// A token type has no policy.
    #[error("No policy registered for token type {0}")]
    MissingMapping(TokenType),

    /// A token type was registered twice.
    #[error("Policy for token type {0} registered more than once")]
    DuplicateMapping(TokenType),

    /// A token type requires no approval level at all.
    #[error("Policy for token type {0} requires no approval level")]
    NoApprovalLevels(TokenType),
}
