// SPDX-License-Identifier: MIT

//! Error types for the synchronization core.
//!
//! Every public operation returns a structured `Result`; nothing is thrown
//! past the library boundary. Offline deferral is deliberately NOT an error
//! variant; see [`crate::services::profile::WriteOutcome`].

use std::time::Duration;

/// Error type for all sync-core operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The remote document store collaborator was never wired up.
    /// Fails immediately, never attempted against the network.
    #[error("Sync backend not initialized")]
    NotInitialized,

    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Invalid profile data: {0}")]
    Invalid(String),

    /// Read attempted while offline with no cached copy to fall back on.
    #[error("Offline and no cached data available")]
    Offline,

    #[error("Remote operation timed out after {0:?}")]
    Timeout(Duration),

    /// Provider-specific failure (network, permission, validation) with an
    /// opaque code/message pair.
    #[error("Remote operation failed [{code}]: {message}")]
    Remote { code: String, message: String },

    #[error("Local storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SyncError {
    /// Remote failure with an opaque provider code.
    pub fn remote(code: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Remote {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether a retry has any chance of succeeding.
    ///
    /// Consulted by queue draining: transient failures get bounded backoff
    /// retries within a drain pass, terminal ones wait for the next
    /// reconnect event.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Remote { .. } | SyncError::Timeout(_))
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SyncError::remote("unavailable", "connection reset").is_transient());
        assert!(SyncError::Timeout(Duration::from_secs(12)).is_transient());

        assert!(!SyncError::NotInitialized.is_transient());
        assert!(!SyncError::NotAuthenticated.is_transient());
        assert!(!SyncError::NotFound("u1".to_string()).is_transient());
        assert!(!SyncError::Invalid("too many photos".to_string()).is_transient());
        assert!(!SyncError::Offline.is_transient());
    }
}
