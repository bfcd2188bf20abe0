//! The key store: generates, persists, and loads the local key pair.

use std::sync::Arc;

use tracing::{debug, info, warn};

use sealdrop_core::{KeyAlgorithm, KeyPair};

use crate::error::Result;
use crate::schema::{
    KeySchema, StoredKeyRecord, LEGACY_PRIVATE_KEY_ITEM, PRIVATE_KEY_ITEM, PUBLIC_KEY_ITEM,
};
use crate::traits::{StorageBackend, StorageScope};

/// Durable home of the local key pair, one pair per scope.
pub struct KeyStore<B: StorageBackend> {
    backend: Arc<B>,
    algorithm: KeyAlgorithm,
}

impl<B: StorageBackend> Clone for KeyStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            algorithm: self.algorithm,
        }
    }
}

impl<B: StorageBackend> KeyStore<B> {
    /// Create a key store over a backend.
    pub fn new(backend: B) -> Self {
        Self::with_backend(Arc::new(backend))
    }

    /// Create a key store sharing an existing backend.
    pub fn with_backend(backend: Arc<B>) -> Self {
        Self {
            backend,
            algorithm: KeyAlgorithm::RsaOaepSha256,
        }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Generate a fresh key pair on the blocking pool. Does not persist.
    pub async fn generate(&self) -> Result<KeyPair> {
        let algorithm = self.algorithm;
        let pair = tokio::task::spawn_blocking(move || KeyPair::generate(algorithm)).await??;
        debug!(fingerprint = %pair.fingerprint(), "generated key pair");
        Ok(pair)
    }

    /// Write a pair under the current schema, replacing any previous one.
    pub async fn persist(&self, scope: &StorageScope, pair: &KeyPair) -> Result<()> {
        let record = StoredKeyRecord::from_pair(pair)?;
        self.backend.set_items(scope, &record.items()).await?;
        info!(
            %scope,
            fingerprint = %pair.fingerprint(),
            schema_version = record.schema.version(),
            "persisted key pair"
        );
        Ok(())
    }

    /// Load the stored pair, if any.
    ///
    /// Reads the current schema first and falls back to the legacy private key.
    /// A legacy hit is copied to the current item once; the legacy item is left
    /// in place. A failed copy is logged and the pair is still returned.
    /// Unreadable or mismatched records are skipped, storage read errors are
    /// returned.
    pub async fn load(&self, scope: &StorageScope) -> Result<Option<KeyPair>> {
        let Some((record, pair)) = self.read(scope).await? else {
            return Ok(None);
        };
        if record.schema == KeySchema::Legacy {
            if let Err(e) = self.migrate_legacy(scope, &record).await {
                warn!(%scope, error = %e, "legacy key migration failed, will retry on next load");
            }
        }
        Ok(Some(pair))
    }

    /// Like [`load`](Self::load), but never writes. Use this from work that
    /// may be cancelled.
    pub async fn peek(&self, scope: &StorageScope) -> Result<Option<KeyPair>> {
        Ok(self.read(scope).await?.map(|(_, pair)| pair))
    }

    async fn read(&self, scope: &StorageScope) -> Result<Option<(StoredKeyRecord, KeyPair)>> {
        let mut items = self
            .backend
            .get_items(
                scope,
                &[PUBLIC_KEY_ITEM, PRIVATE_KEY_ITEM, LEGACY_PRIVATE_KEY_ITEM],
            )
            .await?
            .into_iter();
        let (Some(public), current_private, legacy_private) =
            (items.next().flatten(), items.next().flatten(), items.next().flatten())
        else {
            debug!(%scope, "no public key stored");
            return Ok(None);
        };

        for (schema, private) in [
            (KeySchema::Current, current_private),
            (KeySchema::Legacy, legacy_private),
        ] {
            let Some(private) = private else {
                continue;
            };
            let record = StoredKeyRecord {
                schema,
                public_key_pem: public.to_string(),
                private_key_pem: private,
            };
            match record.to_pair() {
                Ok(pair) => {
                    debug!(
                        %scope,
                        fingerprint = %pair.fingerprint(),
                        schema_version = schema.version(),
                        "loaded key pair"
                    );
                    return Ok(Some((record, pair)));
                }
                Err(e) => {
                    warn!(%scope, schema_version = schema.version(), error = %e, "stored key record unusable");
                }
            }
        }

        Ok(None)
    }

    /// Whether [`load`](Self::load) would return a pair. Never generates.
    pub async fn has_local_keys(&self, scope: &StorageScope) -> Result<bool> {
        Ok(self.load(scope).await?.is_some())
    }

    /// Load the stored pair, or generate and persist a new one.
    ///
    /// The flag is `true` when a new pair was created.
    pub async fn ensure_keys(&self, scope: &StorageScope) -> Result<(KeyPair, bool)> {
        if let Some(pair) = self.load(scope).await? {
            return Ok((pair, false));
        }
        let pair = self.generate().await?;
        self.persist(scope, &pair).await?;
        Ok((pair, true))
    }

    /// Remove the current-schema items. The legacy item is left alone.
    pub async fn clear(&self, scope: &StorageScope) -> Result<()> {
        self.backend
            .remove_items(scope, &[PUBLIC_KEY_ITEM, PRIVATE_KEY_ITEM])
            .await?;
        info!(%scope, "cleared key pair");
        Ok(())
    }

    async fn migrate_legacy(&self, scope: &StorageScope, record: &StoredKeyRecord) -> Result<()> {
        self.backend
            .set_items(
                scope,
                &[(PRIVATE_KEY_ITEM, record.private_key_pem.as_str())],
            )
            .await?;
        info!(
            %scope,
            from = KeySchema::Legacy.version(),
            to = KeySchema::Current.version(),
            "migrated legacy private key"
        );
        Ok(())
    }
}
