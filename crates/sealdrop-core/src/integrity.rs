//! Integrity and authenticity checks on decrypted content.
//!
//! These functions answer yes/no and never error; the caller decides what a
//! failed check means.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::manifest::{HashAlgorithm, Manifest, PackageMetadata};

/// Server-attested signature status of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureState {
    /// The server reports a valid sender signature.
    Valid,
    /// The server reports a signature that failed verification.
    Invalid,
    /// No signature information was attested.
    Absent,
}

/// Compute a digest.
pub fn digest(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    match algorithm {
        HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
    }
}

/// Compute the lowercase hex digest stored in `Manifest::content_hash`.
pub fn content_hash(algorithm: HashAlgorithm, data: &[u8]) -> String {
    hex::encode(digest(algorithm, data))
}

/// Check `plaintext` against the manifest's digest.
///
/// An unknown algorithm or an undecodable hash counts as a mismatch.
pub fn verify_hash(manifest: &Manifest, plaintext: &[u8]) -> bool {
    let Ok(algorithm) = manifest.hash_algorithm() else {
        return false;
    };
    let Ok(expected) = hex::decode(manifest.content_hash.trim()) else {
        return false;
    };
    if expected.len() != algorithm.output_len() {
        return false;
    }

    let actual = digest(algorithm, plaintext);
    actual.ct_eq(&expected).into()
}

/// Read the signature status the server attested in package metadata.
pub fn verify_signature(metadata: &PackageMetadata) -> SignatureState {
    match metadata.signature_valid {
        Some(true) => SignatureState::Valid,
        Some(false) => SignatureState::Invalid,
        None => SignatureState::Absent,
    }
}

/// Check that a plaintext has the size the server recorded at upload.
pub fn verify_size(metadata: &PackageMetadata, plaintext: &[u8]) -> bool {
    u64::try_from(plaintext.len()).map_or(false, |len| len == metadata.original_size)
}
