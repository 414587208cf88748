//! # AppError
//!
//! Centralized error handling for the Citadel board.
//! Every core operation and every persistence port reports one of these kinds,
//! so the routing layer can map them to distinct external statuses.

use thiserror::Error;

/// The primary error type for all citadel-core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Malformed input (e.g., a zero vote value, a blank title, a cross-post parent)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Resource not found (e.g., Post, Comment, User)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// The acting identity is not the author of the resource
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Credentials were rejected at login
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Unique key already taken (e.g., duplicate username)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (e.g., DB down). The message stays server-side.
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: impl ToString) -> Self {
        AppError::NotFound(kind.to_string(), id.to_string())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::InvalidArgument(message.into())
    }
}

/// A specialized Result type for Citadel logic.
pub type Result<T> = std::result::Result<T, AppError>;

/// Rejects blank required text fields with `InvalidArgument`.
pub(crate) fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::invalid(format!("{field} is required")));
    }
    Ok(())
}
