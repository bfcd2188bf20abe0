//! The envelope archive.
//!
//! An envelope is a ZIP archive with four entries:
//!
//! | Entry                | Content                                        |
//! |----------------------|------------------------------------------------|
//! | `manifest.json`      | [`Manifest`] as JSON                           |
//! | `encrypted_file.enc` | `nonce || ciphertext || tag` under the content key |
//! | `encrypted_key.bin`  | content key wrapped with RSA-OAEP/SHA-256       |
//! | `README.txt`         | human-readable instructions                    |
//!
//! [`Envelope::build`] and [`Envelope::parse`] only move bytes in and out of
//! the archive. Cryptographic checks happen in [`Envelope::unwrap_content_key`],
//! [`Envelope::decrypt_payload`] and the [`integrity`](crate::integrity) module.

use chrono::Utc;
use std::io::{Cursor, Read, Write};
use zeroize::Zeroizing;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::cipher::{CipherSuite, ContentKey};
use crate::error::{CoreError, Result};
use crate::integrity;
use crate::keys::{KeyHandle, KeyUsage};
use crate::manifest::{HashAlgorithm, Manifest};

/// Archive entry holding the manifest.
pub const MANIFEST_ENTRY: &str = "manifest.json";

/// Archive entry holding the encrypted payload.
pub const PAYLOAD_ENTRY: &str = "encrypted_file.enc";

/// Archive entry holding the wrapped content key.
pub const WRAPPED_KEY_ENTRY: &str = "encrypted_key.bin";

/// Archive entry holding the instructions.
pub const README_ENTRY: &str = "README.txt";

/// Instructions written into every envelope built here.
pub const README_TEXT: &str = "\
This package was encrypted for a single recipient.

Contents:
  1. manifest.json       - file metadata and SHA-256 digest of the original file
  2. encrypted_file.enc  - the file, encrypted with a one-time symmetric key
                           (12-byte nonce, ciphertext, 16-byte tag)
  3. encrypted_key.bin   - the one-time key, encrypted with the recipient's
                           RSA public key (RSA-OAEP, SHA-256)
  4. README.txt          - this file

To recover the file:
  1. Decrypt encrypted_key.bin with your RSA private key.
  2. Use the result to decrypt encrypted_file.enc.
  3. Compare the SHA-256 digest of the output with contentHash in manifest.json.
";

/// Size limits applied when reading an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeLimits {
    /// Largest accepted uncompressed size of any single entry.
    pub max_entry_size: u64,
}

impl Default for EnvelopeLimits {
    fn default() -> Self {
        Self {
            max_entry_size: 512 * 1024 * 1024,
        }
    }
}

/// The typed parts of an envelope archive.
#[derive(Clone, PartialEq, Eq)]
pub struct Envelope {
    pub manifest: Manifest,
    pub wrapped_key: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub instructions: String,
}

impl Envelope {
    /// Assemble an envelope from its parts.
    pub fn new(
        manifest: Manifest,
        wrapped_key: Vec<u8>,
        ciphertext: Vec<u8>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            manifest,
            wrapped_key,
            ciphertext,
            instructions: instructions.into(),
        }
    }

    /// Write the ZIP archive.
    ///
    /// Entry timestamps are pinned to the ZIP epoch, so equal parts give equal
    /// bytes.
    pub fn build(&self) -> Result<Vec<u8>> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        let manifest_json = self.manifest.to_json()?;
        let entries: [(&str, &[u8]); 4] = [
            (MANIFEST_ENTRY, &manifest_json),
            (PAYLOAD_ENTRY, &self.ciphertext),
            (WRAPPED_KEY_ENTRY, &self.wrapped_key),
            (README_ENTRY, self.instructions.as_bytes()),
        ];

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer.start_file(name, options).map_err(zip_error)?;
            writer
                .write_all(data)
                .map_err(|e| CoreError::MalformedEnvelope(e.to_string()))?;
        }
        let cursor = writer.finish().map_err(zip_error)?;
        Ok(cursor.into_inner())
    }

    /// Read an archive with default limits.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Self::parse_with_limits(bytes, EnvelopeLimits::default())
    }

    /// Read an archive, rejecting entries larger than `limits` allow.
    pub fn parse_with_limits(bytes: &[u8], limits: EnvelopeLimits) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(zip_error)?;

        let manifest_bytes = read_entry(&mut archive, MANIFEST_ENTRY, limits)?;
        let manifest = Manifest::from_json(&manifest_bytes)?;
        let ciphertext = read_entry(&mut archive, PAYLOAD_ENTRY, limits)?;
        let wrapped_key = read_entry(&mut archive, WRAPPED_KEY_ENTRY, limits)?;
        let readme = read_entry(&mut archive, README_ENTRY, limits)?;
        let instructions = String::from_utf8_lossy(&readme).into_owned();

        tracing::debug!(
            filename = %manifest.filename,
            payload_len = ciphertext.len(),
            wrapped_key_len = wrapped_key.len(),
            "parsed envelope"
        );

        Ok(Self {
            manifest,
            wrapped_key,
            ciphertext,
            instructions,
        })
    }

    /// Recover the content key with the recipient's private key.
    ///
    /// Any failure is [`CoreError::KeyMismatch`].
    pub fn unwrap_content_key(&self, private_key: &KeyHandle) -> Result<ContentKey> {
        let raw = private_key.unwrap_key(&self.wrapped_key)?;
        ContentKey::from_unwrapped(&raw)
    }

    /// Decrypt the payload with a recovered content key.
    pub fn decrypt_payload(&self, content_key: &ContentKey) -> Result<Zeroizing<Vec<u8>>> {
        let suite = self.manifest.cipher_suite()?;
        content_key.open(suite, &self.ciphertext)
    }

    /// Unwrap, decrypt, and check the manifest digest in one call.
    pub fn open(&self, private_key: &KeyHandle) -> Result<Zeroizing<Vec<u8>>> {
        // Reject unknown ciphers before spending an RSA operation.
        self.manifest.cipher_suite()?;
        let content_key = self.unwrap_content_key(private_key)?;
        let plaintext = self.decrypt_payload(&content_key)?;
        if !integrity::verify_hash(&self.manifest, &plaintext) {
            return Err(CoreError::IntegrityViolation(
                "content hash does not match manifest".into(),
            ));
        }
        Ok(plaintext)
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("manifest", &self.manifest)
            .field("wrapped_key_len", &self.wrapped_key.len())
            .field("ciphertext_len", &self.ciphertext.len())
            .finish_non_exhaustive()
    }
}

fn read_entry<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    limits: EnvelopeLimits,
) -> Result<Vec<u8>> {
    let entry = archive.by_name(name).map_err(|e| match e {
        ZipError::FileNotFound => CoreError::MalformedEnvelope(format!("missing entry {name}")),
        other => zip_error(other),
    })?;

    if entry.size() > limits.max_entry_size {
        return Err(CoreError::MalformedEnvelope(format!(
            "entry {name} is {} bytes, limit is {}",
            entry.size(),
            limits.max_entry_size
        )));
    }

    // The header size can lie; cap the actual read as well.
    let mut data = Vec::new();
    entry
        .take(limits.max_entry_size + 1)
        .read_to_end(&mut data)
        .map_err(|e| CoreError::MalformedEnvelope(format!("entry {name}: {e}")))?;
    if data.len() as u64 > limits.max_entry_size {
        return Err(CoreError::MalformedEnvelope(format!(
            "entry {name} exceeds {} bytes",
            limits.max_entry_size
        )));
    }
    Ok(data)
}

fn zip_error(e: ZipError) -> CoreError {
    CoreError::MalformedEnvelope(e.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Sender side
// ─────────────────────────────────────────────────────────────────────────────

/// Builds an envelope for one recipient.
///
/// Hashes the plaintext, encrypts it under a fresh content key, and wraps that
/// key with the recipient's public key.
pub struct EnvelopeBuilder {
    plaintext: Zeroizing<Vec<u8>>,
    filename: String,
    mime_type: String,
    cipher: CipherSuite,
    content_key: ContentKey,
}

impl EnvelopeBuilder {
    /// Start building an envelope for `plaintext`.
    pub fn new(plaintext: impl Into<Vec<u8>>) -> Self {
        Self {
            plaintext: Zeroizing::new(plaintext.into()),
            filename: "file.bin".into(),
            mime_type: "application/octet-stream".into(),
            cipher: CipherSuite::default(),
            content_key: ContentKey::generate(),
        }
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Choose the payload cipher. The manifest only names it when it is not
    /// the default.
    pub fn cipher(mut self, cipher: CipherSuite) -> Self {
        self.cipher = cipher;
        self
    }

    /// The content key that will be wrapped.
    pub fn content_key(&self) -> &ContentKey {
        &self.content_key
    }

    /// Encrypt and wrap for `recipient`, which must be a public key.
    pub fn seal(self, recipient: &KeyHandle) -> Result<Envelope> {
        if recipient.usage() != KeyUsage::Encrypt {
            return Err(CoreError::KeyUsage(
                "envelopes are sealed to a public key".into(),
            ));
        }

        let manifest = Manifest {
            filename: self.filename,
            original_size: self.plaintext.len() as u64,
            mime_type: self.mime_type,
            content_hash: integrity::content_hash(HashAlgorithm::Sha256, &self.plaintext),
            algorithm: HashAlgorithm::Sha256.name().to_string(),
            created_at: Some(Utc::now()),
            cipher: (self.cipher != CipherSuite::default()).then(|| self.cipher.name().to_string()),
        };
        let ciphertext = self.content_key.seal(self.cipher, &self.plaintext)?;
        let wrapped_key = recipient.wrap(self.content_key.as_bytes())?;

        Ok(Envelope::new(manifest, wrapped_key, ciphertext, README_TEXT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::tests::shared_pairs;
    use proptest::prelude::*;

    fn sample_envelope() -> Envelope {
        let (alice, _) = shared_pairs();
        EnvelopeBuilder::new(b"quarterly numbers".to_vec())
            .filename("q3.csv")
            .mime_type("text/csv")
            .seal(alice.public_key())
            .unwrap()
    }

    fn archive_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let options = SimpleFileOptions::default();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_build_parse_roundtrip() {
        let envelope = sample_envelope();
        let bytes = envelope.build().unwrap();
        let parsed = Envelope::parse(&bytes).unwrap();
        assert_eq!(parsed, envelope);
        assert_eq!(parsed.instructions, README_TEXT);
    }

    #[test]
    fn test_build_is_deterministic() {
        let envelope = sample_envelope();
        assert_eq!(envelope.build().unwrap(), envelope.build().unwrap());
    }

    #[test]
    fn test_archive_has_expected_entries() {
        let bytes = sample_envelope().build().unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![README_ENTRY, PAYLOAD_ENTRY, WRAPPED_KEY_ENTRY, MANIFEST_ENTRY]
        );
    }

    #[test]
    fn test_open_recovers_plaintext() {
        let (alice, _) = shared_pairs();
        let plaintext = sample_envelope().open(alice.private_key()).unwrap();
        assert_eq!(plaintext.as_slice(), b"quarterly numbers");
    }

    #[test]
    fn test_open_with_wrong_key_is_key_mismatch() {
        let (_, bob) = shared_pairs();
        assert!(matches!(
            sample_envelope().open(bob.private_key()),
            Err(CoreError::KeyMismatch)
        ));
    }

    #[test]
    fn test_open_detects_tampered_manifest_hash() {
        let (alice, _) = shared_pairs();
        let mut envelope = sample_envelope();
        envelope.manifest.content_hash = integrity::content_hash(HashAlgorithm::Sha256, b"other");
        assert!(matches!(
            envelope.open(alice.private_key()),
            Err(CoreError::IntegrityViolation(_))
        ));
    }

    #[test]
    fn test_open_detects_tampered_ciphertext() {
        let (alice, _) = shared_pairs();
        let mut envelope = sample_envelope();
        envelope.ciphertext[14] ^= 0x80;
        assert!(matches!(
            envelope.open(alice.private_key()),
            Err(CoreError::IntegrityViolation(_))
        ));
    }

    #[test]
    fn test_chacha_envelope() {
        let (alice, _) = shared_pairs();
        let envelope = EnvelopeBuilder::new(b"stream cipher".to_vec())
            .cipher(CipherSuite::ChaCha20Poly1305)
            .seal(alice.public_key())
            .unwrap();
        assert_eq!(envelope.manifest.cipher.as_deref(), Some("ChaCha20-Poly1305"));

        let reparsed = Envelope::parse(&envelope.build().unwrap()).unwrap();
        assert_eq!(
            reparsed.open(alice.private_key()).unwrap().as_slice(),
            b"stream cipher"
        );
    }

    #[test]
    fn test_seal_requires_public_key() {
        let (alice, _) = shared_pairs();
        assert!(matches!(
            EnvelopeBuilder::new(b"x".to_vec()).seal(alice.private_key()),
            Err(CoreError::KeyUsage(_))
        ));
    }

    #[test]
    fn test_parse_rejects_missing_entry() {
        let manifest = sample_envelope().manifest.to_json().unwrap();
        let bytes = archive_with(&[
            (MANIFEST_ENTRY, &manifest),
            (PAYLOAD_ENTRY, b"ct"),
            (README_ENTRY, b"readme"),
        ]);
        match Envelope::parse(&bytes) {
            Err(CoreError::MalformedEnvelope(msg)) => assert!(msg.contains(WRAPPED_KEY_ENTRY)),
            other => panic!("expected MalformedEnvelope, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_entry_names_are_case_sensitive() {
        let manifest = sample_envelope().manifest.to_json().unwrap();
        let bytes = archive_with(&[
            ("Manifest.json", &manifest),
            (PAYLOAD_ENTRY, b"ct"),
            (WRAPPED_KEY_ENTRY, b"wk"),
            (README_ENTRY, b"readme"),
        ]);
        assert!(matches!(
            Envelope::parse(&bytes),
            Err(CoreError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_manifest() {
        let bytes = archive_with(&[
            (MANIFEST_ENTRY, b"{\"filename\": 7}"),
            (PAYLOAD_ENTRY, b"ct"),
            (WRAPPED_KEY_ENTRY, b"wk"),
            (README_ENTRY, b"readme"),
        ]);
        assert!(matches!(
            Envelope::parse(&bytes),
            Err(CoreError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_zip() {
        assert!(matches!(
            Envelope::parse(b"definitely not a zip archive"),
            Err(CoreError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_parse_enforces_entry_limit() {
        let bytes = sample_envelope().build().unwrap();
        let limits = EnvelopeLimits { max_entry_size: 8 };
        assert!(matches!(
            Envelope::parse_with_limits(&bytes, limits),
            Err(CoreError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_debug_hides_payload() {
        let debug = format!("{:?}", sample_envelope());
        assert!(debug.contains("ciphertext_len"));
        assert!(!debug.contains("wrapped_key: ["));
    }

    fn arb_manifest() -> impl Strategy<Value = Manifest> {
        (
            "[a-zA-Z0-9 ._-]{1,40}",
            any::<u64>(),
            "[a-z]{1,10}/[a-z0-9.+-]{1,20}",
            proptest::collection::vec(any::<u8>(), 32),
            proptest::option::of(Just("ChaCha20-Poly1305".to_string())),
        )
            .prop_map(|(filename, size, mime, hash, cipher)| Manifest {
                filename,
                original_size: size,
                mime_type: mime,
                content_hash: hex::encode(hash),
                algorithm: "SHA-256".into(),
                created_at: None,
                cipher,
            })
    }

    proptest! {
        #[test]
        fn prop_envelope_roundtrip(
            manifest in arb_manifest(),
            wrapped_key in proptest::collection::vec(any::<u8>(), 0..512),
            ciphertext in proptest::collection::vec(any::<u8>(), 0..4096),
            instructions in ".{0,200}",
        ) {
            let envelope = Envelope::new(manifest, wrapped_key, ciphertext, instructions);
            let bytes = envelope.build().unwrap();
            prop_assert_eq!(Envelope::parse(&bytes).unwrap(), envelope);
        }
    }
}
