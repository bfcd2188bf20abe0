//! Manifest and package metadata documents.
//!
//! Both are JSON with camelCase keys. Snake_case spellings are accepted on
//! read because older servers emitted them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::cipher::CipherSuite;
use crate::error::{CoreError, Result};
use crate::types::PackageId;

/// Digest algorithms a manifest may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha256,
}

impl HashAlgorithm {
    /// Canonical manifest spelling.
    pub const fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA-256",
        }
    }

    /// Digest output length in bytes.
    pub const fn output_len(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SHA-256" | "SHA256" => Ok(HashAlgorithm::Sha256),
            _ => Err(CoreError::UnsupportedAlgorithm(format!("digest {s:?}"))),
        }
    }
}

/// The `manifest.json` entry of an envelope.
///
/// `algorithm` and `cipher` stay as strings so that a manifest naming an
/// unknown algorithm still parses; resolution happens when the value is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub filename: String,
    #[serde(alias = "original_size")]
    pub original_size: u64,
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    /// Lowercase hex digest of the plaintext.
    #[serde(alias = "content_hash")]
    pub content_hash: String,
    /// Digest algorithm name, e.g. `SHA-256`.
    pub algorithm: String,
    #[serde(default, alias = "created_at", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Payload cipher name. Absent means AES-256-GCM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cipher: Option<String>,
}

impl Manifest {
    /// Resolve the digest algorithm.
    pub fn hash_algorithm(&self) -> Result<HashAlgorithm> {
        self.algorithm.parse()
    }

    /// Resolve the payload cipher.
    pub fn cipher_suite(&self) -> Result<CipherSuite> {
        match &self.cipher {
            Some(name) => name.parse(),
            None => Ok(CipherSuite::default()),
        }
    }

    /// Serialize as pretty JSON, the way it is stored in the archive.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| CoreError::MalformedEnvelope(e.to_string()))
    }

    /// Parse from archive bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| CoreError::MalformedEnvelope(format!("manifest.json: {e}")))
    }
}

/// Lifecycle state of a package on the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    Active,
    Expired,
    Downloaded,
    Deleted,
}

/// Server-side description of an uploaded package. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetadata {
    #[serde(alias = "package_id")]
    pub package_id: PackageId,
    pub filename: String,
    #[serde(alias = "original_size")]
    pub original_size: u64,
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    #[serde(alias = "uploaded_at")]
    pub uploaded_at: DateTime<Utc>,
    #[serde(alias = "expires_at")]
    pub expires_at: DateTime<Utc>,
    pub status: PackageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,
    #[serde(default, alias = "signature_valid", skip_serializing_if = "Option::is_none")]
    pub signature_valid: Option<bool>,
}

impl PackageMetadata {
    /// Whether the server still serves this package.
    pub fn is_available(&self) -> bool {
        self.status == PackageStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_manifest() -> Manifest {
        Manifest {
            filename: "report.pdf".into(),
            original_size: 1024,
            mime_type: "application/pdf".into(),
            content_hash: "00".repeat(32),
            algorithm: "SHA-256".into(),
            created_at: None,
            cipher: None,
        }
    }

    #[test]
    fn test_manifest_uses_camel_case() {
        let json = String::from_utf8(sample_manifest().to_json().unwrap()).unwrap();
        assert!(json.contains("\"originalSize\""));
        assert!(json.contains("\"contentHash\""));
        assert!(!json.contains("createdAt"));
        assert!(!json.contains("cipher"));
    }

    #[test]
    fn test_manifest_accepts_snake_case() {
        let json = br#"{
            "filename": "a.txt",
            "original_size": 3,
            "mime_type": "text/plain",
            "content_hash": "abc",
            "algorithm": "sha256",
            "created_at": "2024-05-01T10:00:00Z"
        }"#;
        let manifest = Manifest::from_json(json).unwrap();
        assert_eq!(manifest.original_size, 3);
        assert_eq!(manifest.hash_algorithm().unwrap(), HashAlgorithm::Sha256);
        assert!(manifest.created_at.is_some());
    }

    #[test]
    fn test_manifest_rejects_garbage() {
        assert!(matches!(
            Manifest::from_json(b"not json"),
            Err(CoreError::MalformedEnvelope(_))
        ));
        assert!(matches!(
            Manifest::from_json(br#"{"filename": "x"}"#),
            Err(CoreError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_cipher_resolution() {
        let mut manifest = sample_manifest();
        assert_eq!(manifest.cipher_suite().unwrap(), CipherSuite::Aes256Gcm);

        manifest.cipher = Some("ChaCha20-Poly1305".into());
        assert_eq!(manifest.cipher_suite().unwrap(), CipherSuite::ChaCha20Poly1305);

        manifest.cipher = Some("ROT13".into());
        assert!(matches!(
            manifest.cipher_suite(),
            Err(CoreError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_unknown_digest_is_unsupported() {
        let mut manifest = sample_manifest();
        manifest.algorithm = "MD5".into();
        assert!(matches!(
            manifest.hash_algorithm(),
            Err(CoreError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_metadata_parses_server_shape() {
        let json = r#"{
            "packageId": "pkg-42",
            "filename": "photo.jpg",
            "originalSize": 2048,
            "mimeType": "image/jpeg",
            "uploadedAt": "2024-05-01T10:00:00Z",
            "expiresAt": "2024-05-08T10:00:00.000Z",
            "status": "active",
            "signer": "alice@example.com",
            "signatureValid": true
        }"#;
        let meta: PackageMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.package_id.as_str(), "pkg-42");
        assert_eq!(meta.status, PackageStatus::Active);
        assert_eq!(meta.signature_valid, Some(true));
        assert!(meta.is_available());
    }

    #[test]
    fn test_metadata_optional_signature_fields() {
        let json = r#"{
            "package_id": "pkg-43",
            "filename": "notes.txt",
            "original_size": 5,
            "mime_type": "text/plain",
            "uploaded_at": "2024-05-01T10:00:00Z",
            "expires_at": "2024-05-08T10:00:00Z",
            "status": "expired"
        }"#;
        let meta: PackageMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.signer, None);
        assert_eq!(meta.signature_valid, None);
        assert!(!meta.is_available());
    }
}
