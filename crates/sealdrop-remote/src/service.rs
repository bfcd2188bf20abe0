//! TransferService trait: the abstract interface to the remote service.
//!
//! The service stores uploaded packages and serves them back. It never needs
//! the recipient's private key except for [`TransferService::remote_decrypt`],
//! where the caller explicitly hands it over.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use sealdrop_core::{PackageId, PackageMetadata};

use crate::error::Result;

/// Bearer token for the transfer service.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(Zeroizing<String>);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Zeroizing::new(token.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// A file to upload for one recipient.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    pub filename: String,
    pub mime_type: String,
    pub data: Bytes,
    /// Recipient public key as PEM text.
    pub recipient_public_key: String,
}

/// What the service reports after an upload.
///
/// Servers have used several spellings for these fields; all are accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    #[serde(alias = "package_id", alias = "id")]
    pub package_id: PackageId,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, alias = "encrypted_size")]
    pub encrypted_size: u64,
    #[serde(default, alias = "download_url")]
    pub download_url: Option<String>,
    #[serde(default, alias = "expires_at")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// The remote transfer service.
///
/// Implementations: [`HttpTransferService`](crate::HttpTransferService) for a
/// real server, [`MemoryTransferService`](crate::MemoryTransferService) for
/// tests.
#[async_trait]
pub trait TransferService: Send + Sync {
    /// Upload a file; the service seals it to the recipient key.
    async fn upload(
        &self,
        request: UploadRequest,
        auth: Option<&AccessToken>,
    ) -> Result<UploadReceipt>;

    /// Download the envelope archive for a package.
    async fn fetch_envelope(&self, id: &PackageId, auth: Option<&AccessToken>) -> Result<Bytes>;

    /// Ask the service to decrypt a package with the given private key.
    ///
    /// The key is sent over the wire. Callers should drop their copy as soon
    /// as this returns.
    async fn remote_decrypt(
        &self,
        id: &PackageId,
        private_key_pem: &str,
        auth: Option<&AccessToken>,
    ) -> Result<Zeroizing<Vec<u8>>>;

    /// Fetch the server's description of a package.
    async fn fetch_metadata(
        &self,
        id: &PackageId,
        auth: Option<&AccessToken>,
    ) -> Result<PackageMetadata>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_accepts_snake_case() {
        let json = r#"{
            "package_id": "abc123",
            "filename": "a.txt",
            "size": 10,
            "encryptedSize": 38,
            "downloadUrl": "/download/abc123",
            "expiresAt": "2024-06-01T00:00:00Z"
        }"#;
        let receipt: UploadReceipt = serde_json::from_str(json).unwrap();
        assert_eq!(receipt.package_id.as_str(), "abc123");
        assert_eq!(receipt.encrypted_size, 38);
        assert!(receipt.expires_at.is_some());
    }

    #[test]
    fn test_receipt_accepts_bare_id() {
        let json = r#"{"id": "xyz", "encrypted_size": 5, "download_url": "/d/xyz"}"#;
        let receipt: UploadReceipt = serde_json::from_str(json).unwrap();
        assert_eq!(receipt.package_id.as_str(), "xyz");
        assert_eq!(receipt.encrypted_size, 5);
        assert_eq!(receipt.download_url.as_deref(), Some("/d/xyz"));
        assert_eq!(receipt.expires_at, None);
    }

    #[test]
    fn test_receipt_requires_id() {
        let json = r#"{"filename": "a.txt"}"#;
        assert!(serde_json::from_str::<UploadReceipt>(json).is_err());
    }

    #[test]
    fn test_access_token_debug_redacted() {
        let token = AccessToken::new("secret-token");
        assert!(!format!("{token:?}").contains("secret"));
    }
}
