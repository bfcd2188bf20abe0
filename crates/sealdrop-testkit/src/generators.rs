//! Proptest generators for property-based testing.

use proptest::prelude::*;

use sealdrop_core::{integrity, CipherSuite, HashAlgorithm, Manifest, PackageId};

/// Generate payload bytes of specified max length.
pub fn plaintext(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a valid package id.
pub fn package_id() -> impl Strategy<Value = PackageId> {
    "[A-Za-z0-9][A-Za-z0-9_-]{0,63}".prop_map(|s| PackageId::new(s).expect("pattern is valid"))
}

/// Generate a file name, including non-ASCII ones.
pub fn filename() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9_-]{0,23}\\.(txt|pdf|csv|bin)",
        "[\\p{L}]{1,12}\\.[a-z]{1,4}",
    ]
}

/// Generate a MIME type.
pub fn mime_type() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("text/plain".to_string()),
        Just("application/pdf".to_string()),
        Just("application/octet-stream".to_string()),
        Just("image/png".to_string()),
    ]
}

/// Generate a payload cipher.
pub fn cipher_suite() -> impl Strategy<Value = CipherSuite> {
    prop_oneof![
        Just(CipherSuite::Aes256Gcm),
        Just(CipherSuite::ChaCha20Poly1305),
    ]
}

/// Parameters for sealing an envelope.
#[derive(Debug, Clone)]
pub struct EnvelopeParams {
    pub filename: String,
    pub mime_type: String,
    pub cipher: CipherSuite,
    pub plaintext: Vec<u8>,
}

impl Arbitrary for EnvelopeParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (filename(), mime_type(), cipher_suite(), plaintext(4096))
            .prop_map(|(filename, mime_type, cipher, plaintext)| EnvelopeParams {
                filename,
                mime_type,
                cipher,
                plaintext,
            })
            .boxed()
    }
}

/// The manifest a correct sender would write for `params`.
pub fn manifest_from_params(params: &EnvelopeParams) -> Manifest {
    Manifest {
        filename: params.filename.clone(),
        original_size: params.plaintext.len() as u64,
        mime_type: params.mime_type.clone(),
        content_hash: integrity::content_hash(HashAlgorithm::Sha256, &params.plaintext),
        algorithm: HashAlgorithm::Sha256.name().to_string(),
        created_at: None,
        cipher: (params.cipher != CipherSuite::default()).then(|| params.cipher.name().to_string()),
    }
}
