//! Error types for sealdrop.

use sealdrop_core::CoreError;
use sealdrop_remote::RemoteError;
use sealdrop_store::StoreError;
use thiserror::Error;

/// Errors that can occur during sealdrop operations.
#[derive(Debug, Error)]
pub enum SealdropError {
    /// Key, envelope, or payload error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Transfer service error.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Decrypted content failed a post-decryption check.
    #[error("integrity violation: {0}")]
    Verification(String),

    /// No usable key pair is stored for this session.
    #[error("no local key pair")]
    NoLocalKey,

    /// The attempt was cancelled or superseded.
    #[error("attempt cancelled")]
    Cancelled,
}

/// Result type for sealdrop operations.
pub type Result<T> = std::result::Result<T, SealdropError>;

/// Coarse classification of a [`SealdropError`], stable across variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedKey,
    UnsupportedAlgorithm,
    MalformedEnvelope,
    KeyMismatch,
    IntegrityViolation,
    RemoteDecryptFailed,
    NetworkFailure,
    NoLocalKey,
    Cancelled,
    Storage,
}

impl ErrorKind {
    /// Whether the user can fix this and try again: reconnect, or create a key
    /// pair.
    pub fn is_recoverable(self) -> bool {
        matches!(self, ErrorKind::NetworkFailure | ErrorKind::NoLocalKey)
    }
}

impl SealdropError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SealdropError::Core(e) => core_kind(e),
            SealdropError::Store(StoreError::Key(e)) => core_kind(e),
            SealdropError::Store(_) => ErrorKind::Storage,
            SealdropError::Remote(RemoteError::RemoteDecryptFailed { .. }) => {
                ErrorKind::RemoteDecryptFailed
            }
            SealdropError::Remote(_) => ErrorKind::NetworkFailure,
            SealdropError::Verification(_) => ErrorKind::IntegrityViolation,
            SealdropError::NoLocalKey => ErrorKind::NoLocalKey,
            SealdropError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

fn core_kind(e: &CoreError) -> ErrorKind {
    match e {
        CoreError::MalformedKey(_) | CoreError::KeyUsage(_) | CoreError::EncryptionError(_) => {
            ErrorKind::MalformedKey
        }
        CoreError::UnsupportedAlgorithm(_) => ErrorKind::UnsupportedAlgorithm,
        CoreError::MalformedEnvelope(_) => ErrorKind::MalformedEnvelope,
        CoreError::KeyMismatch => ErrorKind::KeyMismatch,
        CoreError::IntegrityViolation(_) => ErrorKind::IntegrityViolation,
    }
}
