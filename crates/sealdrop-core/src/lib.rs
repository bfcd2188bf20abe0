//! # Sealdrop Core
//!
//! Pure primitives for sealdrop: key encoding, the envelope archive, and
//! integrity checks.
//!
//! This crate does no network or storage I/O.
//!
//! ## Key Types
//!
//! - [`KeyPair`] / [`KeyHandle`] - RSA-OAEP (SHA-256) keys tagged with algorithm and usage
//! - [`EncodedKey`] - PEM-style text form of a key
//! - [`Envelope`] - the four-part ZIP archive a recipient downloads
//! - [`Manifest`] / [`PackageMetadata`] - documents describing a package
//!
//! ## Encryption Model
//!
//! 1. **Content Key**: a one-time 256-bit key encrypts the file (AES-256-GCM,
//!    or ChaCha20-Poly1305 when the manifest says so)
//! 2. **Wrapped Key**: the content key is encrypted to the recipient's RSA
//!    public key with OAEP/SHA-256
//! 3. **Digest**: the manifest carries the SHA-256 of the plaintext, checked
//!    after decryption
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sealdrop_core::{codec, Envelope, EnvelopeBuilder, KeyAlgorithm, KeyPair};
//!
//! let recipient = KeyPair::generate(KeyAlgorithm::RsaOaepSha256).unwrap();
//! let pem = codec::encode(recipient.public_key()).unwrap().to_pem();
//! let public_key = codec::decode(&pem).unwrap();
//!
//! let archive = EnvelopeBuilder::new(b"hello".to_vec())
//!     .filename("hello.txt")
//!     .seal(&public_key)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let plaintext = Envelope::parse(&archive)
//!     .unwrap()
//!     .open(recipient.private_key())
//!     .unwrap();
//! assert_eq!(plaintext.as_slice(), b"hello");
//! ```

pub mod cipher;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod integrity;
pub mod keys;
pub mod manifest;
pub mod types;

pub use cipher::{CipherSuite, ContentKey};
pub use codec::EncodedKey;
pub use envelope::{Envelope, EnvelopeBuilder, EnvelopeLimits};
pub use error::{CoreError, Result};
pub use integrity::{verify_hash, verify_signature, verify_size, SignatureState};
pub use keys::{Fingerprint, KeyAlgorithm, KeyHandle, KeyPair, KeyUsage};
pub use manifest::{HashAlgorithm, Manifest, PackageMetadata, PackageStatus};
pub use types::{InvalidPackageId, PackageId};
