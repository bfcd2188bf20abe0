//! StorageBackend trait: the abstract interface for durable key items.
//!
//! A backend is a small string key/value store partitioned by scope. The key
//! store needs two guarantees from it: reads of several items see one
//! consistent snapshot, and writes of several items land together or not at
//! all.

use async_trait::async_trait;
use std::fmt;
use zeroize::Zeroizing;

use crate::error::Result;

/// Partition of durable storage, typically one per signed-in user.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageScope(String);

impl StorageScope {
    /// Scope used when there is no signed-in user.
    pub const DEFAULT: &'static str = "default";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StorageScope {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl fmt::Debug for StorageScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageScope({})", self.0)
    }
}

impl fmt::Display for StorageScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Async interface for scoped item storage.
///
/// Values may be private keys, so they come back in zeroizing buffers.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read several items from one consistent snapshot.
    ///
    /// The result has one entry per requested name, in order.
    async fn get_items(
        &self,
        scope: &StorageScope,
        names: &[&str],
    ) -> Result<Vec<Option<Zeroizing<String>>>>;

    /// Write several items atomically, replacing existing values.
    async fn set_items(&self, scope: &StorageScope, items: &[(&str, &str)]) -> Result<()>;

    /// Remove several items atomically. Missing items are ignored.
    async fn remove_items(&self, scope: &StorageScope, names: &[&str]) -> Result<()>;
}

#[async_trait]
impl<B: StorageBackend + ?Sized> StorageBackend for std::sync::Arc<B> {
    async fn get_items(
        &self,
        scope: &StorageScope,
        names: &[&str],
    ) -> Result<Vec<Option<Zeroizing<String>>>> {
        (**self).get_items(scope, names).await
    }

    async fn set_items(&self, scope: &StorageScope, items: &[(&str, &str)]) -> Result<()> {
        (**self).set_items(scope, items).await
    }

    async fn remove_items(&self, scope: &StorageScope, names: &[&str]) -> Result<()> {
        (**self).remove_items(scope, names).await
    }
}
