//! The decryption pipeline: from a package id to verified plaintext.
//!
//! Two strategies share one pipeline:
//!
//! - **Local**: download the envelope, unwrap the content key with the local
//!   private key, decrypt, and check the manifest digest.
//! - **Remote**: send the local private key to the transfer service and let it
//!   decrypt; the result is checked against the size the server recorded.
//!
//! Each call to [`DecryptionPipeline::decrypt`] is one attempt. Starting a new
//! attempt for a package id cancels the previous one.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use sealdrop_core::{
    codec, integrity, Envelope, EnvelopeLimits, KeyPair, PackageId, PackageMetadata,
    SignatureState,
};
use sealdrop_remote::TransferService;
use sealdrop_store::{KeyStore, StorageBackend};

use crate::attempt::{AbortSignal, Attempt, AttemptState};
use crate::error::{ErrorKind, Result, SealdropError};
use crate::session::Session;

/// How to recover the plaintext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecryptStrategy {
    /// The transfer service decrypts with the private key we send it.
    Remote,
    /// Everything happens on this machine.
    Local,
}

impl fmt::Display for DecryptStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecryptStrategy::Remote => f.write_str("remote"),
            DecryptStrategy::Local => f.write_str("local"),
        }
    }
}

/// What to do with the server-attested sender signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignaturePolicy {
    /// Record the state on the result; never fail.
    #[default]
    Report,
    /// Fail when the server reports an invalid signature.
    RejectInvalid,
    /// Fail unless the server reports a valid signature.
    RequireValid,
}

impl SignaturePolicy {
    fn check(self, state: SignatureState) -> Result<()> {
        match (self, state) {
            (SignaturePolicy::Report, _) => Ok(()),
            (_, SignatureState::Invalid) => Err(SealdropError::Verification(
                "sender signature is invalid".into(),
            )),
            (SignaturePolicy::RequireValid, SignatureState::Absent) => Err(
                SealdropError::Verification("sender signature is missing".into()),
            ),
            _ => Ok(()),
        }
    }
}

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Fetch package metadata before decrypting. Needed for size and
    /// signature checks.
    pub fetch_metadata: bool,
    /// Signature handling.
    pub signature_policy: SignaturePolicy,
    /// Archive size limits for the local strategy.
    pub limits: EnvelopeLimits,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_metadata: true,
            signature_policy: SignaturePolicy::default(),
            limits: EnvelopeLimits::default(),
        }
    }
}

/// Which check the Verifying stage applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verification {
    /// Digest of the plaintext matched the manifest.
    ContentHash,
    /// Plaintext length matched the server's record.
    OriginalSize,
    /// Remote strategy without metadata: nothing to compare against.
    Unchecked,
}

/// A recovered, verified file.
pub struct DecryptedFile {
    pub package_id: PackageId,
    pub filename: String,
    pub mime_type: String,
    pub strategy: DecryptStrategy,
    pub verification: Verification,
    pub signature: SignatureState,
    pub metadata: Option<PackageMetadata>,
    plaintext: Zeroizing<Vec<u8>>,
}

impl DecryptedFile {
    pub fn plaintext(&self) -> &[u8] {
        &self.plaintext
    }

    pub fn into_plaintext(self) -> Zeroizing<Vec<u8>> {
        self.plaintext
    }

    pub fn len(&self) -> usize {
        self.plaintext.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plaintext.is_empty()
    }
}

impl fmt::Debug for DecryptedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptedFile")
            .field("package_id", &self.package_id)
            .field("filename", &self.filename)
            .field("strategy", &self.strategy)
            .field("verification", &self.verification)
            .field("signature", &self.signature)
            .field("len", &self.plaintext.len())
            .finish_non_exhaustive()
    }
}

/// Plaintext plus where its name and type came from, before the
/// Verifying stage.
struct Recovered {
    plaintext: Zeroizing<Vec<u8>>,
    filename: String,
    mime_type: String,
    verification: Verification,
}

/// The decryption pipeline.
pub struct DecryptionPipeline<B: StorageBackend, T: TransferService> {
    keys: KeyStore<B>,
    service: Arc<T>,
    config: PipelineConfig,
    attempts: Mutex<HashMap<PackageId, Arc<Attempt>>>,
    next_attempt: AtomicU64,
}

impl<B: StorageBackend, T: TransferService> DecryptionPipeline<B, T> {
    pub fn new(keys: KeyStore<B>, service: Arc<T>, config: PipelineConfig) -> Self {
        Self {
            keys,
            service,
            config,
            attempts: Mutex::new(HashMap::new()),
            next_attempt: AtomicU64::new(1),
        }
    }

    pub fn keys(&self) -> &KeyStore<B> {
        &self.keys
    }

    pub fn service(&self) -> &Arc<T> {
        &self.service
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Attempts
    // ─────────────────────────────────────────────────────────────────────────

    /// Register an attempt for `id` without running it.
    ///
    /// Cancels any attempt already running for the same id. Observers can
    /// [`subscribe`](PendingAttempt::subscribe) before calling
    /// [`run`](PendingAttempt::run).
    pub fn begin<'p>(
        &'p self,
        session: &Session,
        id: &PackageId,
        strategy: DecryptStrategy,
    ) -> PendingAttempt<'p, B, T> {
        let attempt = Arc::new(Attempt::new(
            self.next_attempt.fetch_add(1, Ordering::Relaxed),
            id.clone(),
        ));

        let previous = self.lock_attempts().insert(id.clone(), attempt.clone());
        if let Some(previous) = previous {
            debug!(package_id = %id, superseded = previous.id(), "cancelling previous attempt");
            previous.abort();
        }

        PendingAttempt {
            guard: AttemptGuard {
                pipeline: self,
                package_id: id.clone(),
                attempt,
                settled: false,
            },
            session: session.clone(),
            strategy,
        }
    }

    /// Recover and verify a package in one call.
    pub async fn decrypt(
        &self,
        session: &Session,
        id: &PackageId,
        strategy: DecryptStrategy,
    ) -> Result<DecryptedFile> {
        self.begin(session, id, strategy).run().await
    }

    /// Abort the in-flight attempt for `id`. Returns whether one was running.
    pub fn cancel(&self, id: &PackageId) -> bool {
        let attempt = self.lock_attempts().remove(id);
        match attempt {
            Some(attempt) => {
                attempt.abort();
                info!(package_id = %id, attempt = attempt.id(), "attempt cancelled");
                true
            }
            None => false,
        }
    }

    /// Watch the state of the in-flight attempt for `id`.
    pub fn subscribe(&self, id: &PackageId) -> Option<watch::Receiver<AttemptState>> {
        self.lock_attempts().get(id).map(|a| a.subscribe())
    }

    fn lock_attempts(&self) -> std::sync::MutexGuard<'_, HashMap<PackageId, Arc<Attempt>>> {
        self.attempts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn finish(&self, id: &PackageId, attempt: &Arc<Attempt>) {
        let mut attempts = self.lock_attempts();
        if attempts.get(id).is_some_and(|a| Arc::ptr_eq(a, attempt)) {
            attempts.remove(id);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stages
    // ─────────────────────────────────────────────────────────────────────────

    /// Read-only: a cancelled attempt must leave storage untouched.
    async fn load_keys(&self, session: &Session) -> Result<KeyPair> {
        self.keys
            .peek(session.scope())
            .await?
            .ok_or(SealdropError::NoLocalKey)
    }

    async fn fetch_metadata(
        &self,
        session: &Session,
        id: &PackageId,
        signal: &mut AbortSignal,
    ) -> Result<Option<PackageMetadata>> {
        if !self.config.fetch_metadata {
            return Ok(None);
        }
        let metadata = signal
            .race(async {
                self.service
                    .fetch_metadata(id, session.access_token())
                    .await
                    .map_err(SealdropError::from)
            })
            .await?;
        Ok(Some(metadata))
    }

    async fn recover_local(
        &self,
        session: &Session,
        id: &PackageId,
        keys: &KeyPair,
        attempt: &Attempt,
        signal: &mut AbortSignal,
    ) -> Result<Recovered> {
        let archive = signal
            .race(async {
                self.service
                    .fetch_envelope(id, session.access_token())
                    .await
                    .map_err(SealdropError::from)
            })
            .await?;

        attempt.advance(AttemptState::Parsing);
        let limits = self.config.limits;
        let envelope = Arc::new(
            signal
                .race(blocking(move || Envelope::parse_with_limits(&archive, limits)))
                .await?,
        );
        // Reject an unknown cipher before spending an RSA operation.
        envelope.manifest.cipher_suite()?;

        attempt.advance(AttemptState::Unwrapping);
        let content_key = {
            let envelope = envelope.clone();
            let private_key = keys.private_key().clone();
            signal
                .race(blocking(move || envelope.unwrap_content_key(&private_key)))
                .await?
        };

        attempt.advance(AttemptState::Decrypting);
        let plaintext = {
            let envelope = envelope.clone();
            signal
                .race(blocking(move || envelope.decrypt_payload(&content_key)))
                .await?
        };

        attempt.advance(AttemptState::Verifying);
        if !integrity::verify_hash(&envelope.manifest, &plaintext) {
            return Err(SealdropError::Verification(
                "content hash does not match manifest".into(),
            ));
        }

        Ok(Recovered {
            plaintext,
            filename: envelope.manifest.filename.clone(),
            mime_type: envelope.manifest.mime_type.clone(),
            verification: Verification::ContentHash,
        })
    }

    async fn recover_remote(
        &self,
        session: &Session,
        id: &PackageId,
        keys: &KeyPair,
        metadata: Option<&PackageMetadata>,
        attempt: &Attempt,
        signal: &mut AbortSignal,
    ) -> Result<Recovered> {
        attempt.advance(AttemptState::Decrypting);
        let plaintext = {
            let private_key_pem = codec::encode(keys.private_key())?.to_pem();
            let plaintext = signal
                .race(async {
                    self.service
                        .remote_decrypt(id, &private_key_pem, session.access_token())
                        .await
                        .map_err(SealdropError::from)
                })
                .await;
            drop(private_key_pem);
            plaintext?
        };

        attempt.advance(AttemptState::Verifying);
        let verification = match metadata {
            Some(meta) if !integrity::verify_size(meta, &plaintext) => {
                return Err(SealdropError::Verification(format!(
                    "plaintext is {} bytes, server recorded {}",
                    plaintext.len(),
                    meta.original_size
                )));
            }
            Some(_) => Verification::OriginalSize,
            None => Verification::Unchecked,
        };

        Ok(Recovered {
            plaintext,
            filename: metadata.map_or_else(|| id.to_string(), |m| m.filename.clone()),
            mime_type: metadata.map_or_else(
                || "application/octet-stream".to_string(),
                |m| m.mime_type.clone(),
            ),
            verification,
        })
    }
}

/// Run archive inflation or an RSA or AEAD operation off the async workers.
async fn blocking<F, R>(f: F) -> Result<R>
where
    F: FnOnce() -> sealdrop_core::Result<R> + Send + 'static,
    R: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(out) => Ok(out?),
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(_) => Err(SealdropError::Cancelled),
    }
}

/// Settles an attempt that ends without reaching `run`'s end: the pending
/// handle or the `run` future was dropped. Such an attempt is aborted, marked
/// `Failed(Cancelled)`, and deregistered.
struct AttemptGuard<'p, B: StorageBackend, T: TransferService> {
    pipeline: &'p DecryptionPipeline<B, T>,
    package_id: PackageId,
    attempt: Arc<Attempt>,
    settled: bool,
}

impl<'p, B: StorageBackend, T: TransferService> AttemptGuard<'p, B, T> {
    fn settle(&mut self) {
        self.settled = true;
        self.pipeline.finish(&self.package_id, &self.attempt);
    }
}

impl<'p, B: StorageBackend, T: TransferService> Drop for AttemptGuard<'p, B, T> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.attempt.abort();
        if self
            .attempt
            .advance(AttemptState::Failed(ErrorKind::Cancelled))
        {
            debug!(package_id = %self.package_id, attempt = self.attempt.id(), "attempt dropped before completion");
        }
        self.pipeline.finish(&self.package_id, &self.attempt);
    }
}

/// A registered attempt, not yet started. Dropping it cancels the attempt.
pub struct PendingAttempt<'p, B: StorageBackend, T: TransferService> {
    guard: AttemptGuard<'p, B, T>,
    session: Session,
    strategy: DecryptStrategy,
}

impl<'p, B: StorageBackend, T: TransferService> PendingAttempt<'p, B, T> {
    /// Watch this attempt's state.
    pub fn subscribe(&self) -> watch::Receiver<AttemptState> {
        self.guard.attempt.subscribe()
    }

    /// Run the attempt to completion. Dropping the returned future cancels
    /// the attempt.
    pub async fn run(self) -> Result<DecryptedFile> {
        let Self {
            mut guard,
            session,
            strategy,
        } = self;
        let pipeline = guard.pipeline;
        let package_id = guard.package_id.clone();
        let attempt = guard.attempt.clone();
        let mut signal = attempt.signal();

        let result =
            Self::stages(pipeline, &session, &package_id, strategy, &attempt, &mut signal).await;
        // An abort that lands after the last stage still wins.
        let result = result.and_then(|file| signal.check().map(|_| file));

        match &result {
            Ok(file) => {
                attempt.advance(AttemptState::Delivered);
                info!(
                    package_id = %package_id,
                    %strategy,
                    verification = ?file.verification,
                    signature = ?file.signature,
                    len = file.len(),
                    "package delivered"
                );
            }
            Err(e) => {
                let stage = attempt.state();
                attempt.advance(AttemptState::Failed(e.kind()));
                warn!(
                    package_id = %package_id,
                    %strategy,
                    %stage,
                    kind = ?e.kind(),
                    error = %e,
                    "decrypt attempt failed"
                );
            }
        }
        guard.settle();
        result
    }

    async fn stages(
        pipeline: &DecryptionPipeline<B, T>,
        session: &Session,
        id: &PackageId,
        strategy: DecryptStrategy,
        attempt: &Attempt,
        signal: &mut AbortSignal,
    ) -> Result<DecryptedFile> {
        let keys = signal.race(pipeline.load_keys(session)).await?;

        attempt.advance(AttemptState::Fetching);
        let metadata = pipeline.fetch_metadata(session, id, signal).await?;

        let recovered = match strategy {
            DecryptStrategy::Local => {
                pipeline
                    .recover_local(session, id, &keys, attempt, signal)
                    .await?
            }
            DecryptStrategy::Remote => {
                pipeline
                    .recover_remote(session, id, &keys, metadata.as_ref(), attempt, signal)
                    .await?
            }
        };
        drop(keys);

        let signature = metadata
            .as_ref()
            .map_or(SignatureState::Absent, integrity::verify_signature);
        pipeline.config.signature_policy.check(signature)?;

        Ok(DecryptedFile {
            package_id: id.clone(),
            filename: recovered.filename,
            mime_type: recovered.mime_type,
            strategy,
            verification: recovered.verification,
            signature,
            metadata,
            plaintext: recovered.plaintext,
        })
    }
}
