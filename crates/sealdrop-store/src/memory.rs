//! In-memory implementation of the StorageBackend trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::error::{Result, StoreError};
use crate::traits::{StorageBackend, StorageScope};

/// In-memory storage backend.
///
/// All data is lost when the backend is dropped. A single RwLock makes each
/// call atomic.
pub struct MemoryStorage {
    inner: RwLock<HashMap<(StorageScope, String), Zeroizing<String>>>,
}

impl MemoryStorage {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Number of items stored across all scopes.
    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn get_items(
        &self,
        scope: &StorageScope,
        names: &[&str],
    ) -> Result<Vec<Option<Zeroizing<String>>>> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(names
            .iter()
            .map(|name| inner.get(&(scope.clone(), (*name).to_string())).cloned())
            .collect())
    }

    async fn set_items(&self, scope: &StorageScope, items: &[(&str, &str)]) -> Result<()> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        for (name, value) in items {
            inner.insert(
                (scope.clone(), (*name).to_string()),
                Zeroizing::new((*value).to_string()),
            );
        }
        Ok(())
    }

    async fn remove_items(&self, scope: &StorageScope, names: &[&str]) -> Result<()> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        for name in names {
            inner.remove(&(scope.clone(), (*name).to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let storage = MemoryStorage::new();
        let scope = StorageScope::new("alice");

        storage
            .set_items(&scope, &[("a", "1"), ("b", "2")])
            .await
            .unwrap();

        let values = storage.get_items(&scope, &["b", "missing", "a"]).await.unwrap();
        assert_eq!(values[0].as_deref().map(String::as_str), Some("2"));
        assert!(values[1].is_none());
        assert_eq!(values[2].as_deref().map(String::as_str), Some("1"));
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let storage = MemoryStorage::new();
        let alice = StorageScope::new("alice");
        let bob = StorageScope::new("bob");

        storage.set_items(&alice, &[("k", "alice")]).await.unwrap();
        let values = storage.get_items(&bob, &["k"]).await.unwrap();
        assert!(values[0].is_none());
    }

    #[tokio::test]
    async fn test_remove_items() {
        let storage = MemoryStorage::new();
        let scope = StorageScope::default();

        storage.set_items(&scope, &[("a", "1"), ("b", "2")]).await.unwrap();
        storage.remove_items(&scope, &["a", "never-set"]).await.unwrap();

        assert_eq!(storage.len(), 1);
        let values = storage.get_items(&scope, &["a", "b"]).await.unwrap();
        assert!(values[0].is_none());
        assert!(values[1].is_some());
    }
}
