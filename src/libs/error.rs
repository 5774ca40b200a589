//! Error taxonomy shared by the timekeeper core.
//!
//! The duration engine and reference code generator never fail; they clamp
//! or substitute placeholders instead. Everything that touches a store or
//! the access-grant lifecycle returns a [`TimekeeperError`] so callers can
//! tell a missing token from an expired one, or a duplicate grant from a
//! denied read.

use thiserror::Error;
use tracing::warn;

/// Result type alias using [`TimekeeperError`].
pub type Result<T> = std::result::Result<T, TimekeeperError>;

/// Errors surfaced by the timekeeper core.
#[derive(Debug, Error)]
pub enum TimekeeperError {
    /// No identity could be resolved for the caller.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Token, grant, session or location absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Token past its time-to-live.
    #[error("Expired: {0}")]
    Expired(String),

    /// Duplicate grant for an (owner, viewer) pair.
    #[error("{0}")]
    Conflict(String),

    /// Invalid input such as an exit before entry or a malformed QR payload.
    #[error("{0}")]
    Validation(String),

    /// The requester holds no active grant for the target identity.
    ///
    /// Deliberately carries no detail about the target.
    #[error("Access denied")]
    AccessDenied,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl TimekeeperError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "NOT_AUTHENTICATED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Expired(_) => "EXPIRED",
            Self::Conflict(_) => "CONFLICT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Csv(_) => "CSV_ERROR",
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Errors a read reports to the user instead of showing an empty result.
    pub fn surfaces_on_read(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::AccessDenied | Self::Validation(_) | Self::Config(_))
    }
}

/// Replaces a failed read with an empty result, unless the error is one the
/// user has to see (see [`TimekeeperError::surfaces_on_read`]).
pub fn or_empty<T: Default>(result: Result<T>, what: &str) -> Result<T> {
    match result {
        Err(e) if !e.surfaces_on_read() => {
            warn!(error = %e, what, "Read failed, showing an empty result");
            Ok(T::default())
        }
        other => other,
    }
}
