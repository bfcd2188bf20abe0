//! Asymmetric key handles and key pairs.
//!
//! A [`KeyHandle`] is an algorithm- and usage-tagged key. Public handles wrap
//! content keys, private handles unwrap them. The only algorithm implemented
//! today is RSA-OAEP with SHA-256 (MGF1-SHA-256), which is what WebCrypto
//! produces for `{name: "RSA-OAEP", hash: "SHA-256"}`.

use rsa::pkcs8::EncodePublicKey;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

use crate::error::{CoreError, Result};

/// Modulus size for freshly generated RSA keys.
pub const RSA_MODULUS_BITS: usize = 2048;

/// Asymmetric algorithms a key handle can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    /// RSA-OAEP, SHA-256 for both the label hash and MGF1.
    RsaOaepSha256,
}

impl KeyAlgorithm {
    /// JOSE-style name, used in logs and error messages.
    pub const fn name(self) -> &'static str {
        match self {
            KeyAlgorithm::RsaOaepSha256 => "RSA-OAEP-256",
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a handle may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyUsage {
    /// Public half: wraps content keys.
    Encrypt,
    /// Private half: unwraps content keys.
    Decrypt,
}

#[derive(Clone, PartialEq, Eq)]
enum KeyMaterial {
    RsaPublic(RsaPublicKey),
    RsaPrivate(Box<RsaPrivateKey>),
}

/// An opaque, loaded asymmetric key.
///
/// Private material is zeroized when the handle is dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyHandle {
    algorithm: KeyAlgorithm,
    material: KeyMaterial,
}

impl KeyHandle {
    /// Bind an RSA public key for wrapping.
    pub fn from_rsa_public(key: RsaPublicKey) -> Self {
        Self {
            algorithm: KeyAlgorithm::RsaOaepSha256,
            material: KeyMaterial::RsaPublic(key),
        }
    }

    /// Bind an RSA private key for unwrapping.
    pub fn from_rsa_private(key: RsaPrivateKey) -> Self {
        Self {
            algorithm: KeyAlgorithm::RsaOaepSha256,
            material: KeyMaterial::RsaPrivate(Box::new(key)),
        }
    }

    /// The algorithm this handle is bound to.
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// The usage this handle is bound to.
    pub fn usage(&self) -> KeyUsage {
        match self.material {
            KeyMaterial::RsaPublic(_) => KeyUsage::Encrypt,
            KeyMaterial::RsaPrivate(_) => KeyUsage::Decrypt,
        }
    }

    /// Is this the private half?
    pub fn is_private(&self) -> bool {
        self.usage() == KeyUsage::Decrypt
    }

    /// Public counterpart of this handle (itself if already public).
    pub fn public_key(&self) -> KeyHandle {
        match &self.material {
            KeyMaterial::RsaPublic(_) => self.clone(),
            KeyMaterial::RsaPrivate(key) => Self::from_rsa_public(key.to_public_key()),
        }
    }

    /// Encrypt a content key under this public key.
    pub fn wrap(&self, content_key: &[u8]) -> Result<Vec<u8>> {
        match &self.material {
            KeyMaterial::RsaPublic(key) => {
                let mut rng = rand::thread_rng();
                key.encrypt(&mut rng, Oaep::new::<Sha256>(), content_key)
                    .map_err(|e| CoreError::EncryptionError(e.to_string()))
            }
            KeyMaterial::RsaPrivate(_) => Err(CoreError::KeyUsage(
                "private keys cannot wrap content keys".into(),
            )),
        }
    }

    /// Recover a content key wrapped under the matching public key.
    ///
    /// Every failure collapses to [`CoreError::KeyMismatch`] so callers cannot
    /// tell padding errors apart from a wrong key.
    pub fn unwrap_key(&self, wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        match &self.material {
            KeyMaterial::RsaPrivate(key) => key
                .decrypt(Oaep::new::<Sha256>(), wrapped)
                .map(Zeroizing::new)
                .map_err(|_| CoreError::KeyMismatch),
            KeyMaterial::RsaPublic(_) => Err(CoreError::KeyUsage(
                "public keys cannot unwrap content keys".into(),
            )),
        }
    }

    /// DER-encoded SubjectPublicKeyInfo of the public half.
    pub fn public_key_der(&self) -> Result<Vec<u8>> {
        let public = match &self.material {
            KeyMaterial::RsaPublic(key) => key.clone(),
            KeyMaterial::RsaPrivate(key) => key.to_public_key(),
        };
        public
            .to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| CoreError::MalformedKey(e.to_string()))
    }

    /// Fingerprint of the public half.
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        Ok(Fingerprint::of_der(&self.public_key_der()?))
    }

    pub(crate) fn as_rsa_private(&self) -> Option<&RsaPrivateKey> {
        match &self.material {
            KeyMaterial::RsaPrivate(key) => Some(key),
            KeyMaterial::RsaPublic(_) => None,
        }
    }
}

impl fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyHandle")
            .field("algorithm", &self.algorithm)
            .field("usage", &self.usage())
            .finish_non_exhaustive()
    }
}

/// SHA-256 digest of a public key's SPKI DER.
///
/// For display and equality only.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    /// Fingerprint raw SPKI DER bytes.
    pub fn of_der(spki_der: &[u8]) -> Self {
        Self(Sha256::digest(spki_der).into())
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A matched public/private key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    public_key: KeyHandle,
    private_key: KeyHandle,
    fingerprint: Fingerprint,
}

impl KeyPair {
    /// Generate a fresh, exportable key pair.
    ///
    /// RSA generation takes a noticeable amount of CPU; async callers should
    /// run it on a blocking thread.
    pub fn generate(algorithm: KeyAlgorithm) -> Result<Self> {
        match algorithm {
            KeyAlgorithm::RsaOaepSha256 => {
                let mut rng = rand::thread_rng();
                let private = RsaPrivateKey::new(&mut rng, RSA_MODULUS_BITS)
                    .map_err(|e| CoreError::EncryptionError(e.to_string()))?;
                let public = private.to_public_key();
                Self::from_parts(
                    KeyHandle::from_rsa_public(public),
                    KeyHandle::from_rsa_private(private),
                )
            }
        }
    }

    /// Assemble a pair from separately loaded halves.
    ///
    /// Fails with [`CoreError::KeyMismatch`] unless the private half's public
    /// key equals the given public half.
    pub fn from_parts(public_key: KeyHandle, private_key: KeyHandle) -> Result<Self> {
        if public_key.usage() != KeyUsage::Encrypt || private_key.usage() != KeyUsage::Decrypt {
            return Err(CoreError::KeyUsage(
                "key pair needs one public and one private half".into(),
            ));
        }
        if public_key.algorithm() != private_key.algorithm()
            || private_key.public_key() != public_key
        {
            return Err(CoreError::KeyMismatch);
        }
        let fingerprint = public_key.fingerprint()?;
        Ok(Self {
            public_key,
            private_key,
            fingerprint,
        })
    }

    /// The public (wrapping) half.
    pub fn public_key(&self) -> &KeyHandle {
        &self.public_key
    }

    /// The private (unwrapping) half.
    pub fn private_key(&self) -> &KeyHandle {
        &self.private_key
    }

    /// Fingerprint of the public half.
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// The pair's algorithm.
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.public_key.algorithm()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.algorithm())
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}
