//! # Sealdrop Testkit
//!
//! Testing utilities for sealdrop.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Vectors**: Known-answer digests and manifest spellings every reader must accept
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: A recipient with stored keys and an in-memory transfer service
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use sealdrop_testkit::generators::{manifest_from_params, EnvelopeParams};
//!
//! proptest! {
//!     #[test]
//!     fn manifest_hash_matches(params: EnvelopeParams) {
//!         let manifest = manifest_from_params(&params);
//!         prop_assert!(sealdrop_core::verify_hash(&manifest, &params.plaintext));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use sealdrop::{DecryptStrategy, PipelineConfig};
//! use sealdrop_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new().await;
//! let id = fixture.upload("a.txt", "text/plain", b"hello").await;
//! let file = fixture
//!     .pipeline(PipelineConfig::default())
//!     .decrypt(&fixture.session, &id, DecryptStrategy::Local)
//!     .await?;
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{metadata_for, shared_key_pair, MemoryPipeline, TestFixture};
pub use generators::{manifest_from_params, EnvelopeParams};
pub use vectors::{hash_vectors, manifest_vectors, verify_all_vectors, HashVector, ManifestVector};
