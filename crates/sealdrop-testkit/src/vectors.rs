//! Known-answer vectors.
//!
//! Digests are published SHA-256 test values. Manifest documents are the
//! spellings senders have emitted over time; every one must parse to the
//! same fields.

use sealdrop_core::{integrity, HashAlgorithm, Manifest};

/// A plaintext and its expected digest.
#[derive(Debug, Clone)]
pub struct HashVector {
    pub name: &'static str,
    pub input: &'static [u8],
    /// Lowercase hex SHA-256.
    pub expected: &'static str,
}

/// A manifest document and the fields it must decode to.
#[derive(Debug, Clone)]
pub struct ManifestVector {
    pub name: &'static str,
    pub json: &'static str,
    pub filename: &'static str,
    pub original_size: u64,
    pub mime_type: &'static str,
}

pub fn hash_vectors() -> Vec<HashVector> {
    vec![
        HashVector {
            name: "empty",
            input: b"",
            expected: "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        },
        HashVector {
            name: "abc",
            input: b"abc",
            expected: "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        },
        HashVector {
            name: "two blocks",
            input: b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq",
            expected: "248d6a61d20638b8e5c026930c3e6039a33ce45964ff2167f6ecedd419db06c1",
        },
    ]
}

pub fn manifest_vectors() -> Vec<ManifestVector> {
    vec![
        ManifestVector {
            name: "camelCase",
            json: r#"{
                "filename": "q3.csv",
                "originalSize": 3,
                "mimeType": "text/csv",
                "contentHash": "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
                "algorithm": "SHA-256",
                "createdAt": "2024-05-01T10:00:00Z"
            }"#,
            filename: "q3.csv",
            original_size: 3,
            mime_type: "text/csv",
        },
        ManifestVector {
            name: "snake_case",
            json: r#"{
                "filename": "q3.csv",
                "original_size": 3,
                "mime_type": "text/csv",
                "content_hash": "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD",
                "algorithm": "sha256"
            }"#,
            filename: "q3.csv",
            original_size: 3,
            mime_type: "text/csv",
        },
        ManifestVector {
            name: "explicit cipher",
            json: r#"{
                "filename": "notes.txt",
                "originalSize": 3,
                "mimeType": "text/plain",
                "contentHash": "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
                "algorithm": "SHA-256",
                "cipher": "AES-256-GCM"
            }"#,
            filename: "notes.txt",
            original_size: 3,
            mime_type: "text/plain",
        },
    ]
}

/// Check every vector. Returns the names of the ones that fail.
pub fn verify_all_vectors() -> Vec<&'static str> {
    let mut failures = Vec::new();

    for v in hash_vectors() {
        if integrity::content_hash(HashAlgorithm::Sha256, v.input) != v.expected {
            failures.push(v.name);
        }
    }

    for v in manifest_vectors() {
        let ok = Manifest::from_json(v.json.as_bytes()).is_ok_and(|m| {
            m.filename == v.filename
                && m.original_size == v.original_size
                && m.mime_type == v.mime_type
                && m.hash_algorithm().is_ok()
                && m.cipher_suite().is_ok()
                && integrity::verify_hash(&m, b"abc")
        });
        if !ok {
            failures.push(v.name);
        }
    }

    failures
}
