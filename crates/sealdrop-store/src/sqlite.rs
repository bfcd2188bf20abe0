//! SQLite implementation of the StorageBackend trait.
//!
//! Uses rusqlite with bundled SQLite, wrapped in async via
//! tokio::spawn_blocking. Multi-item reads and writes each run in one
//! transaction.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use zeroize::Zeroizing;

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{StorageBackend, StorageScope};

/// SQLite-based storage backend.
///
/// Thread-safe via internal Mutex.
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut conn)
        })
        .await?
    }
}

#[async_trait]
impl StorageBackend for SqliteStorage {
    async fn get_items(
        &self,
        scope: &StorageScope,
        names: &[&str],
    ) -> Result<Vec<Option<Zeroizing<String>>>> {
        let scope = scope.as_str().to_string();
        let names: Vec<String> = names.iter().map(|n| (*n).to_string()).collect();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let mut values = Vec::with_capacity(names.len());
            {
                let mut stmt =
                    tx.prepare_cached("SELECT value FROM key_items WHERE scope = ?1 AND item = ?2")?;
                for name in &names {
                    let value: Option<String> = stmt
                        .query_row(params![scope, name], |row| row.get(0))
                        .optional()?;
                    values.push(value.map(Zeroizing::new));
                }
            }
            tx.commit()?;
            Ok(values)
        })
        .await
    }

    async fn set_items(&self, scope: &StorageScope, items: &[(&str, &str)]) -> Result<()> {
        let scope = scope.as_str().to_string();
        let items: Vec<(String, Zeroizing<String>)> = items
            .iter()
            .map(|(n, v)| ((*n).to_string(), Zeroizing::new((*v).to_string())))
            .collect();

        self.blocking(move |conn| {
            let now = migration::now_millis();
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO key_items (scope, item, value, updated_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(scope, item) DO UPDATE SET
                        value = excluded.value,
                        updated_at = excluded.updated_at",
                )?;
                for (name, value) in &items {
                    stmt.execute(params![scope, name, value.as_str(), now])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn remove_items(&self, scope: &StorageScope, names: &[&str]) -> Result<()> {
        let scope = scope.as_str().to_string();
        let names: Vec<String> = names.iter().map(|n| (*n).to_string()).collect();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt =
                    tx.prepare_cached("DELETE FROM key_items WHERE scope = ?1 AND item = ?2")?;
                for name in &names {
                    stmt.execute(params![scope, name])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }
}
