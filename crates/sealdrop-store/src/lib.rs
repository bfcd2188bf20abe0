//! # Sealdrop Store
//!
//! Durable storage for the local key pair. Provides a trait-based interface
//! for scoped item storage with SQLite and in-memory implementations, and the
//! [`KeyStore`] that encodes key pairs into it.
//!
//! ## Key Types
//!
//! - [`StorageBackend`] - async trait for scoped, atomic item reads and writes
//! - [`SqliteStorage`] - SQLite-based persistent storage
//! - [`MemoryStorage`] - in-memory storage for tests
//! - [`KeyStore`] - generate, persist, load, and migrate key pairs
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sealdrop_store::{KeyStore, SqliteStorage, StorageScope};
//!
//! async fn example() {
//!     let store = KeyStore::new(SqliteStorage::open("keys.db").unwrap());
//!     let scope = StorageScope::new("alice@example.com");
//!
//!     let (pair, created) = store.ensure_keys(&scope).await.unwrap();
//!     println!("fingerprint {} (new: {created})", pair.fingerprint());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Two schemas**: the private key is read from `myPrivateKey`, falling back
//!   to the legacy `user_private_key`; only the former is ever written
//! - **Atomic batches**: the public and private halves are written together

pub mod error;
pub mod keystore;
pub mod memory;
pub mod migration;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use keystore::KeyStore;
pub use memory::MemoryStorage;
pub use schema::{KeySchema, StoredKeyRecord};
pub use sqlite::SqliteStorage;
pub use traits::{StorageBackend, StorageScope};
