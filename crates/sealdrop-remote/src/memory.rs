//! In-memory transfer service.
//!
//! Behaves like the real server: uploads are sealed to the recipient key with
//! [`EnvelopeBuilder`], downloads return the archive, and remote decrypt opens
//! it with the key the caller sends. Test knobs let callers delay responses,
//! take the service offline, and plant their own archives.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use rand::RngCore;
use zeroize::Zeroizing;

use sealdrop_core::{
    codec, Envelope, EnvelopeBuilder, PackageId, PackageMetadata, PackageStatus,
};

use crate::error::{RemoteError, Result};
use crate::service::{AccessToken, TransferService, UploadReceipt, UploadRequest};

/// Days an uploaded package stays available.
const PACKAGE_TTL_DAYS: i64 = 7;

struct StoredPackage {
    archive: Bytes,
    metadata: PackageMetadata,
}

/// In-memory transfer service for tests.
#[derive(Default)]
pub struct MemoryTransferService {
    packages: Mutex<HashMap<PackageId, StoredPackage>>,
    latency_ms: AtomicU64,
    offline: AtomicBool,
    requests: AtomicU64,
}

impl MemoryTransferService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(ms, Ordering::SeqCst);
    }

    /// When offline, every call fails with [`RemoteError::Network`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of calls received so far.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    /// Store an archive as-is under `metadata.package_id`.
    pub fn insert_package(&self, archive: impl Into<Bytes>, metadata: PackageMetadata) -> Result<()> {
        self.lock()?.insert(
            metadata.package_id.clone(),
            StoredPackage {
                archive: archive.into(),
                metadata,
            },
        );
        Ok(())
    }

    /// The stored archive for a package.
    pub fn archive(&self, id: &PackageId) -> Option<Bytes> {
        self.lock().ok()?.get(id).map(|p| p.archive.clone())
    }

    /// Record a server-attested signature on a package.
    pub fn set_signature(&self, id: &PackageId, signer: &str, valid: bool) -> Result<()> {
        let mut packages = self.lock()?;
        let package = packages.get_mut(id).ok_or_else(|| not_found(id))?;
        package.metadata.signer = Some(signer.to_string());
        package.metadata.signature_valid = Some(valid);
        Ok(())
    }

    /// Change a package's lifecycle status.
    pub fn set_status(&self, id: &PackageId, status: PackageStatus) -> Result<()> {
        let mut packages = self.lock()?;
        let package = packages.get_mut(id).ok_or_else(|| not_found(id))?;
        package.metadata.status = status;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<PackageId, StoredPackage>>> {
        self.packages
            .lock()
            .map_err(|_| RemoteError::Network("service state poisoned".into()))
    }

    async fn enter(&self) -> Result<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Network("service unreachable".into()));
        }
        Ok(())
    }

    fn package(&self, id: &PackageId) -> Result<(Bytes, PackageMetadata)> {
        let packages = self.lock()?;
        let package = packages.get(id).ok_or_else(|| not_found(id))?;
        if !package.metadata.is_available() {
            return Err(RemoteError::Status {
                status: 410,
                reason: format!("package is {:?}", package.metadata.status).to_lowercase(),
            });
        }
        Ok((package.archive.clone(), package.metadata.clone()))
    }
}

fn not_found(id: &PackageId) -> RemoteError {
    RemoteError::Status {
        status: 404,
        reason: format!("package {id} not found"),
    }
}

fn new_package_id() -> Result<PackageId> {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    PackageId::new(hex::encode(bytes)).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl TransferService for MemoryTransferService {
    async fn upload(
        &self,
        request: UploadRequest,
        _auth: Option<&AccessToken>,
    ) -> Result<UploadReceipt> {
        self.enter().await?;

        let bad_request = |reason: String| RemoteError::Status {
            status: 400,
            reason,
        };
        let recipient = codec::decode(&request.recipient_public_key)
            .map_err(|e| bad_request(format!("recipientPublicKey: {e}")))?;
        let archive = EnvelopeBuilder::new(request.data.to_vec())
            .filename(request.filename.clone())
            .mime_type(request.mime_type.clone())
            .seal(&recipient)
            .and_then(|envelope| envelope.build())
            .map_err(|e| bad_request(e.to_string()))?;

        let package_id = new_package_id()?;
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(PACKAGE_TTL_DAYS);
        let metadata = PackageMetadata {
            package_id: package_id.clone(),
            filename: request.filename.clone(),
            original_size: request.data.len() as u64,
            mime_type: request.mime_type,
            uploaded_at: now,
            expires_at,
            status: PackageStatus::Active,
            signer: None,
            signature_valid: None,
        };
        let encrypted_size = archive.len() as u64;
        self.insert_package(archive, metadata)?;

        Ok(UploadReceipt {
            download_url: Some(format!("/download/{package_id}")),
            package_id,
            filename: request.filename,
            size: request.data.len() as u64,
            encrypted_size,
            expires_at: Some(expires_at),
        })
    }

    async fn fetch_envelope(&self, id: &PackageId, _auth: Option<&AccessToken>) -> Result<Bytes> {
        self.enter().await?;
        Ok(self.package(id)?.0)
    }

    async fn remote_decrypt(
        &self,
        id: &PackageId,
        private_key_pem: &str,
        _auth: Option<&AccessToken>,
    ) -> Result<Zeroizing<Vec<u8>>> {
        self.enter().await?;
        let (archive, _) = self.package(id).map_err(|e| match e {
            RemoteError::Status { status, reason } => RemoteError::RemoteDecryptFailed { status, reason },
            other => other,
        })?;

        let failed = |reason: String| RemoteError::RemoteDecryptFailed {
            status: 400,
            reason,
        };
        let private_key = codec::decode(private_key_pem).map_err(|e| failed(e.to_string()))?;
        Envelope::parse(&archive)
            .and_then(|envelope| envelope.open(&private_key))
            .map_err(|e| failed(e.to_string()))
    }

    async fn fetch_metadata(
        &self,
        id: &PackageId,
        _auth: Option<&AccessToken>,
    ) -> Result<PackageMetadata> {
        self.enter().await?;
        let packages = self.lock()?;
        packages
            .get(id)
            .map(|p| p.metadata.clone())
            .ok_or_else(|| not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealdrop_core::{KeyAlgorithm, KeyPair};
    use std::sync::OnceLock;

    fn recipient() -> &'static KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| KeyPair::generate(KeyAlgorithm::RsaOaepSha256).unwrap())
    }

    fn upload_request(data: &'static [u8]) -> UploadRequest {
        UploadRequest {
            filename: "hello.txt".into(),
            mime_type: "text/plain".into(),
            data: Bytes::from_static(data),
            recipient_public_key: codec::public_key_pem(recipient().public_key()).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_upload_then_download_and_open() {
        let service = MemoryTransferService::new();
        let receipt = service.upload(upload_request(b"hi there"), None).await.unwrap();
        assert_eq!(receipt.size, 8);

        let archive = service.fetch_envelope(&receipt.package_id, None).await.unwrap();
        let plaintext = Envelope::parse(&archive)
            .unwrap()
            .open(recipient().private_key())
            .unwrap();
        assert_eq!(plaintext.as_slice(), b"hi there");
    }

    #[tokio::test]
    async fn test_remote_decrypt() {
        let service = MemoryTransferService::new();
        let receipt = service.upload(upload_request(b"server side"), None).await.unwrap();
        let pem = codec::encode(recipient().private_key()).unwrap().to_pem();

        let plaintext = service
            .remote_decrypt(&receipt.package_id, &pem, None)
            .await
            .unwrap();
        assert_eq!(plaintext.as_slice(), b"server side");
    }

    #[tokio::test]
    async fn test_remote_decrypt_with_garbage_key() {
        let service = MemoryTransferService::new();
        let receipt = service.upload(upload_request(b"x"), None).await.unwrap();

        let err = service
            .remote_decrypt(&receipt.package_id, "not a key", None)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::RemoteDecryptFailed { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_unknown_package_is_404() {
        let service = MemoryTransferService::new();
        let id: PackageId = "missing".parse().unwrap();
        let err = service.fetch_envelope(&id, None).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_expired_package_is_gone() {
        let service = MemoryTransferService::new();
        let receipt = service.upload(upload_request(b"old"), None).await.unwrap();
        service
            .set_status(&receipt.package_id, PackageStatus::Expired)
            .unwrap();

        let err = service.fetch_envelope(&receipt.package_id, None).await.unwrap_err();
        assert_eq!(err.status(), Some(410));
        // Metadata stays readable.
        let meta = service.fetch_metadata(&receipt.package_id, None).await.unwrap();
        assert_eq!(meta.status, PackageStatus::Expired);
    }

    #[tokio::test]
    async fn test_offline() {
        let service = MemoryTransferService::new();
        service.set_offline(true);
        let err = service.upload(upload_request(b"x"), None).await.unwrap_err();
        assert!(matches!(err, RemoteError::Network(_)));
        assert_eq!(service.request_count(), 1);
    }

    #[tokio::test]
    async fn test_signature_knob() {
        let service = MemoryTransferService::new();
        let receipt = service.upload(upload_request(b"signed"), None).await.unwrap();
        service
            .set_signature(&receipt.package_id, "alice@example.com", true)
            .unwrap();

        let meta = service.fetch_metadata(&receipt.package_id, None).await.unwrap();
        assert_eq!(meta.signer.as_deref(), Some("alice@example.com"));
        assert_eq!(meta.signature_valid, Some(true));
    }
}
