//! Transfer service error types.

use thiserror::Error;

/// Result type for transfer service operations.
pub type Result<T> = std::result::Result<T, RemoteError>;

/// Errors that can occur talking to the transfer service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The service could not be reached.
    #[error("network failure: {0}")]
    Network(String),

    /// The service answered a request with a non-success status.
    #[error("service returned {status}: {reason}")]
    Status { status: u16, reason: String },

    /// The service refused or failed to decrypt a package.
    #[error("remote decrypt failed ({status}): {reason}")]
    RemoteDecryptFailed { status: u16, reason: String },

    /// The service answered with a body we could not interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RemoteError {
    /// HTTP status attached to this error, if the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } | RemoteError::RemoteDecryptFailed { status, .. } => {
                Some(*status)
            }
            RemoteError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
