//! Error types for the sealdrop core.

use thiserror::Error;

/// Errors raised by key handling, envelope parsing, and payload decryption.
///
/// Messages never carry key material or plaintext.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Key text or DER structure could not be decoded.
    #[error("malformed key: {0}")]
    MalformedKey(String),

    /// The key (or cipher) names an algorithm this build does not implement.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The envelope archive is missing entries or has an unreadable manifest.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The wrapped content key could not be recovered with this private key.
    ///
    /// Deliberately carries no detail: wrong key pair and corrupted wrap are
    /// indistinguishable to the caller.
    #[error("wrapped key does not match this key pair")]
    KeyMismatch,

    /// Decrypted content failed authentication or its digest check.
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    /// A key was used for an operation its usage does not allow.
    #[error("key usage error: {0}")]
    KeyUsage(String),

    /// Key generation or encryption failure on the sending side.
    #[error("encryption error: {0}")]
    EncryptionError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
