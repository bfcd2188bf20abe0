//! Symmetric payload encryption.
//!
//! Each envelope carries one random 256-bit content key. The payload file is
//! `nonce (12 bytes) || ciphertext || tag (16 bytes)`.

use aes_gcm::Aes256Gcm;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::ChaCha20Poly1305;
use rand::RngCore;
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{CoreError, Result};

/// Content key length in bytes.
pub const CONTENT_KEY_LEN: usize = 32;

/// Nonce length for both supported ciphers.
pub const NONCE_LEN: usize = 12;

/// Authentication tag length for both supported ciphers.
pub const TAG_LEN: usize = 16;

/// Payload ciphers an envelope may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CipherSuite {
    /// AES-256 in Galois/Counter Mode.
    #[default]
    Aes256Gcm,
    /// ChaCha20-Poly1305 (RFC 8439).
    ChaCha20Poly1305,
}

impl CipherSuite {
    /// Name as written in `manifest.json`.
    pub const fn name(self) -> &'static str {
        match self {
            CipherSuite::Aes256Gcm => "AES-256-GCM",
            CipherSuite::ChaCha20Poly1305 => "ChaCha20-Poly1305",
        }
    }
}

impl fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CipherSuite {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().replace('_', "-").as_str() {
            "AES-256-GCM" | "AES256-GCM" | "A256GCM" => Ok(CipherSuite::Aes256Gcm),
            "CHACHA20-POLY1305" => Ok(CipherSuite::ChaCha20Poly1305),
            _ => Err(CoreError::UnsupportedAlgorithm(format!("cipher {s:?}"))),
        }
    }
}

/// A one-time symmetric content key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ContentKey([u8; CONTENT_KEY_LEN]);

impl ContentKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; CONTENT_KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; CONTENT_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Take an unwrapped key. A wrong length means the wrap was not ours.
    pub fn from_unwrapped(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; CONTENT_KEY_LEN] = bytes.try_into().map_err(|_| CoreError::KeyMismatch)?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; CONTENT_KEY_LEN] {
        &self.0
    }

    /// Encrypt a payload, prepending a fresh random nonce.
    pub fn seal(&self, suite: CipherSuite, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = match suite {
            CipherSuite::Aes256Gcm => Aes256Gcm::new_from_slice(&self.0)
                .map_err(|e| CoreError::EncryptionError(e.to_string()))?
                .encrypt(aes_gcm::Nonce::from_slice(&nonce), plaintext),
            CipherSuite::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(&self.0)
                .map_err(|e| CoreError::EncryptionError(e.to_string()))?
                .encrypt(chacha20poly1305::Nonce::from_slice(&nonce), plaintext),
        }
        .map_err(|e| CoreError::EncryptionError(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt `nonce || ciphertext || tag`.
    ///
    /// Authentication failure is an integrity violation: the ciphertext was
    /// altered or was never produced under this key.
    pub fn open(&self, suite: CipherSuite, data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if data.len() < NONCE_LEN + TAG_LEN {
            return Err(CoreError::IntegrityViolation(
                "payload shorter than nonce and tag".into(),
            ));
        }
        let (nonce, ciphertext) = data.split_at(NONCE_LEN);

        let plaintext = match suite {
            CipherSuite::Aes256Gcm => Aes256Gcm::new_from_slice(&self.0)
                .map_err(|_| CoreError::KeyMismatch)?
                .decrypt(aes_gcm::Nonce::from_slice(nonce), ciphertext),
            CipherSuite::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(&self.0)
                .map_err(|_| CoreError::KeyMismatch)?
                .decrypt(chacha20poly1305::Nonce::from_slice(nonce), ciphertext),
        }
        .map_err(|_| CoreError::IntegrityViolation("payload authentication failed".into()))?;

        Ok(Zeroizing::new(plaintext))
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_both_suites() {
        for suite in [CipherSuite::Aes256Gcm, CipherSuite::ChaCha20Poly1305] {
            let key = ContentKey::generate();
            let sealed = key.seal(suite, b"hello, sealed world").unwrap();
            assert_eq!(sealed.len(), NONCE_LEN + 19 + TAG_LEN);

            let opened = key.open(suite, &sealed).unwrap();
            assert_eq!(opened.as_slice(), b"hello, sealed world");
        }
    }

    #[test]
    fn test_open_with_wrong_key_fails() {
        let key1 = ContentKey::generate();
        let key2 = ContentKey::generate();
        let sealed = key1.seal(CipherSuite::Aes256Gcm, b"secret").unwrap();

        assert!(matches!(
            key2.open(CipherSuite::Aes256Gcm, &sealed),
            Err(CoreError::IntegrityViolation(_))
        ));
    }

    #[test]
    fn test_open_detects_bit_flip() {
        let key = ContentKey::generate();
        let mut sealed = key.seal(CipherSuite::ChaCha20Poly1305, b"do not touch").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;

        assert!(key.open(CipherSuite::ChaCha20Poly1305, &sealed).is_err());
    }

    #[test]
    fn test_open_rejects_truncated_payload() {
        let key = ContentKey::generate();
        assert!(matches!(
            key.open(CipherSuite::Aes256Gcm, &[0u8; NONCE_LEN + TAG_LEN - 1]),
            Err(CoreError::IntegrityViolation(_))
        ));
    }

    #[test]
    fn test_from_unwrapped_checks_length() {
        assert!(ContentKey::from_unwrapped(&[1u8; 32]).is_ok());
        assert!(matches!(
            ContentKey::from_unwrapped(&[1u8; 16]),
            Err(CoreError::KeyMismatch)
        ));
    }

    #[test]
    fn test_cipher_suite_names() {
        assert_eq!("AES-256-GCM".parse::<CipherSuite>().unwrap(), CipherSuite::Aes256Gcm);
        assert_eq!("aes-256-gcm".parse::<CipherSuite>().unwrap(), CipherSuite::Aes256Gcm);
        assert_eq!(
            "chacha20_poly1305".parse::<CipherSuite>().unwrap(),
            CipherSuite::ChaCha20Poly1305
        );
        assert!(matches!(
            "AES-128-CBC".parse::<CipherSuite>(),
            Err(CoreError::UnsupportedAlgorithm(_))
        ));
    }
}
