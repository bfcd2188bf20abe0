//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use chrono::{Duration, Utc};

use sealdrop::{DecryptionPipeline, PipelineConfig, Session};
use sealdrop_core::{
    codec, Envelope, EnvelopeBuilder, KeyAlgorithm, KeyPair, PackageId, PackageMetadata,
    PackageStatus,
};
use sealdrop_remote::{MemoryTransferService, TransferService, UploadRequest};
use sealdrop_store::{KeyStore, MemoryStorage};

/// Pipeline type the fixture builds.
pub type MemoryPipeline = DecryptionPipeline<MemoryStorage, MemoryTransferService>;

/// A process-wide key pair. RSA generation is slow, so each slot is
/// generated once and reused by every test in the binary.
pub fn shared_key_pair(slot: usize) -> KeyPair {
    static PAIRS: OnceLock<Vec<KeyPair>> = OnceLock::new();
    let pairs = PAIRS.get_or_init(|| {
        (0..3)
            .map(|_| KeyPair::generate(KeyAlgorithm::RsaOaepSha256).expect("key generation"))
            .collect()
    });
    pairs[slot % pairs.len()].clone()
}

/// A recipient with stored keys, an in-memory transfer service, and a session.
pub struct TestFixture {
    pub session: Session,
    pub pair: KeyPair,
    pub storage: Arc<MemoryStorage>,
    pub service: Arc<MemoryTransferService>,
}

impl TestFixture {
    /// Fixture for the default scope, keys already persisted.
    pub async fn new() -> Self {
        Self::with_session(Session::default(), 0).await
    }

    /// Fixture for `session` using shared key slot `slot`.
    pub async fn with_session(session: Session, slot: usize) -> Self {
        let pair = shared_key_pair(slot);
        let storage = Arc::new(MemoryStorage::new());
        KeyStore::with_backend(storage.clone())
            .persist(session.scope(), &pair)
            .await
            .expect("persist fixture keys");

        Self {
            session,
            pair,
            storage,
            service: Arc::new(MemoryTransferService::new()),
        }
    }

    /// A key store over the fixture's storage.
    pub fn key_store(&self) -> KeyStore<MemoryStorage> {
        KeyStore::with_backend(self.storage.clone())
    }

    /// A pipeline over the fixture's storage and service.
    pub fn pipeline(&self, config: PipelineConfig) -> MemoryPipeline {
        DecryptionPipeline::new(self.key_store(), self.service.clone(), config)
    }

    /// The recipient public key as PEM.
    pub fn public_key_pem(&self) -> String {
        codec::public_key_pem(self.pair.public_key()).expect("encode public key")
    }

    /// Upload `data` to the fixture's service, sealed for the fixture's key.
    pub async fn upload(&self, filename: &str, mime_type: &str, data: &[u8]) -> PackageId {
        self.upload_for(&self.public_key_pem(), filename, mime_type, data)
            .await
    }

    /// Upload `data` sealed for an arbitrary recipient.
    pub async fn upload_for(
        &self,
        recipient_pem: &str,
        filename: &str,
        mime_type: &str,
        data: &[u8],
    ) -> PackageId {
        self.service
            .upload(
                UploadRequest {
                    filename: filename.to_string(),
                    mime_type: mime_type.to_string(),
                    data: Bytes::copy_from_slice(data),
                    recipient_public_key: recipient_pem.to_string(),
                },
                self.session.access_token(),
            )
            .await
            .expect("upload")
            .package_id
    }

    /// Seal `data` for the fixture's key without uploading.
    pub fn seal(&self, filename: &str, data: &[u8]) -> Envelope {
        EnvelopeBuilder::new(data.to_vec())
            .filename(filename)
            .mime_type("application/octet-stream")
            .seal(self.pair.public_key())
            .expect("seal")
    }

    /// Store raw archive bytes under `id`, with metadata derived from
    /// `envelope`'s manifest.
    pub fn plant(&self, id: &str, envelope: &Envelope, archive: impl Into<Bytes>) -> PackageId {
        let id: PackageId = id.parse().expect("package id");
        self.service
            .insert_package(archive, metadata_for(&id, envelope))
            .expect("insert package");
        id
    }
}

/// Active metadata describing `envelope` under `id`.
pub fn metadata_for(id: &PackageId, envelope: &Envelope) -> PackageMetadata {
    let now = Utc::now();
    PackageMetadata {
        package_id: id.clone(),
        filename: envelope.manifest.filename.clone(),
        original_size: envelope.manifest.original_size,
        mime_type: envelope.manifest.mime_type.clone(),
        uploaded_at: now,
        expires_at: now + Duration::days(7),
        status: PackageStatus::Active,
        signer: None,
        signature_valid: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealdrop::DecryptStrategy;

    #[tokio::test]
    async fn test_fixture_keys_are_loadable() {
        let fixture = TestFixture::new().await;
        let loaded = fixture
            .key_store()
            .load(fixture.session.scope())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.fingerprint(), fixture.pair.fingerprint());
    }

    #[tokio::test]
    async fn test_upload_then_decrypt() {
        let fixture = TestFixture::new().await;
        let id = fixture.upload("a.txt", "text/plain", b"fixture data").await;

        let file = fixture
            .pipeline(PipelineConfig::default())
            .decrypt(&fixture.session, &id, DecryptStrategy::Local)
            .await
            .unwrap();
        assert_eq!(file.plaintext(), b"fixture data");
    }

    #[tokio::test]
    async fn test_slots_differ() {
        assert_ne!(shared_key_pair(0).fingerprint(), shared_key_pair(1).fingerprint());
        assert_eq!(shared_key_pair(0).fingerprint(), shared_key_pair(3).fingerprint());
    }

    #[tokio::test]
    async fn test_plant_uses_manifest_metadata() {
        let fixture = TestFixture::new().await;
        let envelope = fixture.seal("planted.bin", b"xyz");
        let archive = envelope.build().unwrap();
        let id = fixture.plant("planted", &envelope, archive.clone());

        let meta = fixture
            .service
            .fetch_metadata(&id, None)
            .await
            .unwrap();
        assert_eq!(meta.original_size, 3);
        assert_eq!(fixture.service.archive(&id).unwrap().as_ref(), archive.as_slice());
    }
}
