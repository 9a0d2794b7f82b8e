//! Error types for the contact-discovery library.
//!
//! Identifier-level failures (`InvalidInput`, `HashingFailed`) are recovered
//! by the sync pipeline and aggregated into the result's `errors` list.
//! Everything else aborts the operation that raised it.

use thiserror::Error;

/// Errors that can occur while discovering or inviting contacts.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Contact access was attempted without a granted permission
    #[error("{0}")]
    PermissionDenied(String),

    /// A phone number or email failed normalization
    #[error("{0}")]
    InvalidInput(String),

    /// The hashing backend itself failed
    #[error("Hashing failed: {0}")]
    HashingFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The host platform cannot provide contacts
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// Unexpected failure while fetching contacts during a sync
    #[error("Failed to sync contacts: {0}")]
    ContactSyncFailed(String),

    /// Failure reported by a host contact-store binding
    #[error("Platform error: {0}")]
    Platform(String),

    /// Remote endpoint failure, already translated for display.
    ///
    /// `code` is the raw server code and is kept for logging only.
    #[error("{message}")]
    Remote {
        /// Raw callable error code, when the server supplied one
        code: Option<String>,
        /// User-facing message
        message: String,
    },

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DiscoveryError {
    /// True for failures that only affect a single identifier.
    #[must_use]
    pub const fn is_identifier_level(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::HashingFailed(_))
    }

    pub(crate) fn remote(code: Option<&str>, message: impl Into<String>) -> Self {
        Self::Remote {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }
}

/// Convenience type alias for Result with `DiscoveryError`
pub type Result<T> = std::result::Result<T, DiscoveryError>;

impl From<anyhow::Error> for DiscoveryError {
    fn from(err: anyhow::Error) -> Self {
        Self::Platform(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_displays_message_only() {
        let err = DiscoveryError::remote(Some("resource-exhausted"), "Slow down");
        assert_eq!(err.to_string(), "Slow down");
    }

    #[test]
    fn test_identifier_level_classification() {
        assert!(DiscoveryError::InvalidInput("x".into()).is_identifier_level());
        assert!(DiscoveryError::HashingFailed("x".into()).is_identifier_level());
        assert!(!DiscoveryError::ContactSyncFailed("x".into()).is_identifier_level());
    }
}
