//! Error types shared across the Switcher client crates.

use thiserror::Error;

/// Errors produced by the Switcher client.
#[derive(Debug, Error)]
pub enum SwitcherError {
    /// The context is missing required fields for remote operation.
    #[error("context is invalid, missing required fields: {0}")]
    ContextInvalid(String),

    /// Authentication against the remote API failed.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// A transport endpoint other than `/criteria` returned a non-2xx status.
    #[error("[{operation}] failed with status: {status}")]
    RemoteFailed {
        /// Name of the remote operation that failed.
        operation: &'static str,
        /// HTTP status code returned by the service.
        status: u16,
    },

    /// The `/criteria` endpoint returned a non-2xx status.
    #[error("[check_criteria] failed with status: {status}")]
    CriteriaFailed {
        /// HTTP status code returned by the service.
        status: u16,
    },

    /// A local decision was requested before any snapshot was loaded.
    #[error("snapshot not loaded, try to use 'Client::load_snapshot'")]
    SnapshotNotLoaded,

    /// No config with the requested key exists in the snapshot.
    #[error("config with key '{0}' not found in the snapshot")]
    KeyNotFound(String),

    /// Caller-supplied input is invalid (missing key, bad duration string).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Network-level failure (connect, DNS, request timeout).
    #[error("connection error: {0}")]
    Connection(String),

    /// A response body could not be deserialized.
    #[error("failed to deserialize response: {0}")]
    Deserialization(String),

    /// Snapshot file could not be read or written.
    #[error("snapshot file error: {0}")]
    SnapshotFile(String),
}

impl SwitcherError {
    /// Returns `true` when the error came from the remote transport and a
    /// silent-mode fallback is applicable.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::AuthFailed(_)
                | Self::RemoteFailed { .. }
                | Self::CriteriaFailed { .. }
                | Self::Connection(_)
                | Self::Deserialization(_)
        )
    }

    /// Returns the HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteFailed { status, .. } | Self::CriteriaFailed { status } => Some(*status),
            _ => None,
        }
    }
}
