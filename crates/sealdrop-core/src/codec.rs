//! Key codec: key handles to and from PEM-style text.
//!
//! Public keys travel as SubjectPublicKeyInfo DER, private keys as PKCS#8 DER,
//! both base64-encoded at 64 columns between `-----BEGIN {LABEL}-----` and
//! `-----END {LABEL}-----`. Decoding validates the frame first, then the
//! base64, then the algorithm identifier inside the DER, and only then asks
//! the algorithm backend to parse the key.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rsa::pkcs8::spki::SubjectPublicKeyInfoRef;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, PrivateKeyInfo};
use rsa::{RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

use crate::error::{CoreError, Result};
use crate::keys::{KeyAlgorithm, KeyHandle, KeyUsage};

/// Base64 line width inside the frame.
pub const PEM_LINE_WIDTH: usize = 64;

/// Frame label for public keys.
pub const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";

/// Frame label for private keys.
pub const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";

/// OID of `rsaEncryption`, the algorithm identifier WebCrypto writes for
/// RSA-OAEP keys in both SPKI and PKCS#8.
const RSA_ENCRYPTION_OID: &str = "1.2.840.113549.1.1.1";

const BEGIN_PREFIX: &str = "-----BEGIN ";
const END_PREFIX: &str = "-----END ";
const DASHES: &str = "-----";

/// A key in its textual transport form.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedKey {
    algorithm: KeyAlgorithm,
    usage: KeyUsage,
    body_base64: Zeroizing<String>,
}

impl EncodedKey {
    /// The algorithm declared by the key's DER.
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// Public (`Encrypt`) or private (`Decrypt`).
    pub fn usage(&self) -> KeyUsage {
        self.usage
    }

    /// Base64 body with no whitespace.
    pub fn body_base64(&self) -> &str {
        &self.body_base64
    }

    /// The frame label matching this key's usage.
    pub fn label(&self) -> &'static str {
        label_for(self.usage)
    }

    /// Render the framed text.
    pub fn to_pem(&self) -> Zeroizing<String> {
        let label = self.label();
        let body = self.body_base64.as_bytes();
        let capacity = body.len() + body.len() / PEM_LINE_WIDTH + 64;
        let mut out = Zeroizing::new(String::with_capacity(capacity));
        out.push_str(BEGIN_PREFIX);
        out.push_str(label);
        out.push_str(DASHES);
        out.push('\n');
        for line in body.chunks(PEM_LINE_WIDTH) {
            // Base64 output is ASCII, so every chunk is valid UTF-8.
            out.push_str(std::str::from_utf8(line).unwrap_or_default());
            out.push('\n');
        }
        out.push_str(END_PREFIX);
        out.push_str(label);
        out.push_str(DASHES);
        out
    }

    /// Parse framed text without building a key handle.
    pub fn from_pem(text: &str) -> Result<Self> {
        let (label, body) = split_frame(text)?;
        let usage = usage_for(label)?;

        let body_base64: Zeroizing<String> =
            Zeroizing::new(body.chars().filter(|c| !c.is_ascii_whitespace()).collect());
        if body_base64.is_empty() {
            return Err(CoreError::MalformedKey("empty key body".into()));
        }

        let der = Zeroizing::new(
            STANDARD
                .decode(body_base64.as_bytes())
                .map_err(|e| CoreError::MalformedKey(format!("invalid base64: {e}")))?,
        );
        let algorithm = algorithm_of(usage, &der)?;

        Ok(Self {
            algorithm,
            usage,
            body_base64,
        })
    }

    /// Rebuild the key handle this text describes.
    pub fn to_handle(&self) -> Result<KeyHandle> {
        let der = Zeroizing::new(
            STANDARD
                .decode(self.body_base64.as_bytes())
                .map_err(|e| CoreError::MalformedKey(format!("invalid base64: {e}")))?,
        );
        match (self.algorithm, self.usage) {
            (KeyAlgorithm::RsaOaepSha256, KeyUsage::Encrypt) => RsaPublicKey::from_public_key_der(&der)
                .map(KeyHandle::from_rsa_public)
                .map_err(|e| CoreError::MalformedKey(e.to_string())),
            (KeyAlgorithm::RsaOaepSha256, KeyUsage::Decrypt) => RsaPrivateKey::from_pkcs8_der(&der)
                .map(KeyHandle::from_rsa_private)
                .map_err(|e| CoreError::MalformedKey(e.to_string())),
        }
    }
}

impl std::fmt::Debug for EncodedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedKey")
            .field("algorithm", &self.algorithm)
            .field("usage", &self.usage)
            .field("body_len", &self.body_base64.len())
            .finish()
    }
}

/// Export a key handle to its transport form.
pub fn encode(handle: &KeyHandle) -> Result<EncodedKey> {
    let der: Zeroizing<Vec<u8>> = match handle.usage() {
        KeyUsage::Encrypt => Zeroizing::new(handle.public_key_der()?),
        KeyUsage::Decrypt => {
            let key = handle
                .as_rsa_private()
                .ok_or_else(|| CoreError::MalformedKey("private handle without material".into()))?;
            let doc = key
                .to_pkcs8_der()
                .map_err(|e| CoreError::MalformedKey(e.to_string()))?;
            Zeroizing::new(doc.as_bytes().to_vec())
        }
    };

    Ok(EncodedKey {
        algorithm: handle.algorithm(),
        usage: handle.usage(),
        body_base64: Zeroizing::new(STANDARD.encode(der.as_slice())),
    })
}

/// Parse framed text into a key handle.
pub fn decode(text: &str) -> Result<KeyHandle> {
    EncodedKey::from_pem(text)?.to_handle()
}

/// Shorthand for the framed text of a public key.
pub fn public_key_pem(handle: &KeyHandle) -> Result<String> {
    let public = handle.public_key();
    Ok(encode(&public)?.to_pem().to_string())
}

fn label_for(usage: KeyUsage) -> &'static str {
    match usage {
        KeyUsage::Encrypt => PUBLIC_KEY_LABEL,
        KeyUsage::Decrypt => PRIVATE_KEY_LABEL,
    }
}

fn usage_for(label: &str) -> Result<KeyUsage> {
    match label {
        PUBLIC_KEY_LABEL => Ok(KeyUsage::Encrypt),
        PRIVATE_KEY_LABEL => Ok(KeyUsage::Decrypt),
        // PKCS#1, encrypted PKCS#8, EC keys and friends are real formats we
        // do not implement.
        other if other.ends_with(" KEY") => Err(CoreError::UnsupportedAlgorithm(format!(
            "key format {other:?}"
        ))),
        other => Err(CoreError::MalformedKey(format!("unexpected label {other:?}"))),
    }
}

/// Split `-----BEGIN X----- body -----END X-----` into `(X, body)`.
fn split_frame(text: &str) -> Result<(&str, &str)> {
    let text = text.trim();

    let rest = text
        .strip_prefix(BEGIN_PREFIX)
        .ok_or_else(|| CoreError::MalformedKey("missing BEGIN line".into()))?;
    let header_end = rest
        .find(DASHES)
        .ok_or_else(|| CoreError::MalformedKey("unterminated BEGIN line".into()))?;
    let label = &rest[..header_end];
    let rest = &rest[header_end + DASHES.len()..];

    let footer_start = rest
        .rfind(END_PREFIX)
        .ok_or_else(|| CoreError::MalformedKey("missing END line".into()))?;
    let body = &rest[..footer_start];
    let footer = &rest[footer_start + END_PREFIX.len()..];

    let end_label = footer
        .strip_suffix(DASHES)
        .ok_or_else(|| CoreError::MalformedKey("unterminated END line".into()))?;
    if end_label != label {
        return Err(CoreError::MalformedKey(format!(
            "BEGIN label {label:?} does not match END label {end_label:?}"
        )));
    }
    if body.contains(DASHES) {
        return Err(CoreError::MalformedKey("more than one frame".into()));
    }

    Ok((label, body))
}

/// Read the algorithm identifier out of SPKI or PKCS#8 DER.
fn algorithm_of(usage: KeyUsage, der: &[u8]) -> Result<KeyAlgorithm> {
    let oid = match usage {
        KeyUsage::Encrypt => SubjectPublicKeyInfoRef::try_from(der)
            .map_err(|e| CoreError::MalformedKey(format!("invalid SubjectPublicKeyInfo: {e}")))?
            .algorithm
            .oid
            .to_string(),
        KeyUsage::Decrypt => PrivateKeyInfo::try_from(der)
            .map_err(|e| CoreError::MalformedKey(format!("invalid PKCS#8: {e}")))?
            .algorithm
            .oid
            .to_string(),
    };

    match oid.as_str() {
        RSA_ENCRYPTION_OID => Ok(KeyAlgorithm::RsaOaepSha256),
        other => Err(CoreError::UnsupportedAlgorithm(format!("key algorithm OID {other}"))),
    }
}
