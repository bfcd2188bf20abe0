//! # Sealdrop
//!
//! Client side of an envelope-encrypted file transfer service.
//!
//! ## Overview
//!
//! A sender encrypts a file for a recipient's RSA public key. The transfer
//! service stores the resulting envelope: a ZIP archive holding the manifest,
//! the AES-GCM payload, and the RSA-OAEP wrapped content key. This crate gives
//! the recipient:
//!
//! - **Key lifecycle**: generate, persist, load, and migrate the local RSA
//!   key pair
//! - **Decryption pipeline**: recover a package either locally or through the
//!   service, then verify what came back
//! - **Attempts**: every recovery is an observable, cancellable state machine
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use sealdrop::{DecryptStrategy, DecryptionPipeline, PipelineConfig, Session};
//! use sealdrop::remote::{HttpTransferService, RemoteConfig};
//! use sealdrop::store::{KeyStore, SqliteStorage};
//!
//! async fn example() -> sealdrop::Result<()> {
//!     let keys = KeyStore::new(SqliteStorage::open("keys.db")?);
//!     let service = Arc::new(HttpTransferService::new(RemoteConfig::from_env()?)?);
//!     let pipeline = DecryptionPipeline::new(keys, service, PipelineConfig::default());
//!
//!     let session = Session::new("alice").with_access_token("jwt");
//!     let (_pair, created) = pipeline.keys().ensure_keys(session.scope()).await?;
//!     if created {
//!         // Share the public key with senders first.
//!     }
//!
//!     let id = "3f2a9c".parse().expect("valid package id");
//!     let file = pipeline.decrypt(&session, &id, DecryptStrategy::Local).await?;
//!     println!("{} ({} bytes)", file.filename, file.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `sealdrop::core` - keys, PEM codec, envelopes, integrity checks
//! - `sealdrop::store` - key storage backends and the key store
//! - `sealdrop::remote` - the transfer service client

pub mod attempt;
pub mod error;
pub mod pipeline;
pub mod session;

pub use attempt::AttemptState;
pub use error::{ErrorKind, Result, SealdropError};
pub use pipeline::{
    DecryptStrategy, DecryptedFile, DecryptionPipeline, PendingAttempt, PipelineConfig,
    SignaturePolicy, Verification,
};
pub use session::Session;

pub use sealdrop_core as core;
pub use sealdrop_remote as remote;
pub use sealdrop_store as store;

pub use sealdrop_core::{PackageId, SignatureState};
