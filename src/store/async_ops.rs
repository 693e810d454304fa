//! Async wrappers.
//!
//! SQLite calls block, so each wrapper clones the handle and runs the
//! synchronous operation on tokio's blocking pool. Use these from async
//! contexts; they need a running tokio runtime.

use super::handle::KvStore;
use crate::error::{Error, Result};
use crate::expiry::Timestamp;
use crate::value::{Entry, Value};
use std::collections::HashMap;

impl KvStore {
    /// Runs `op` against a clone of this handle on the blocking pool.
    async fn run_blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&KvStore) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| Error::Task(format!("Task join error: {e}")))?
    }

    /// Async version of [`KvStore::get`].
    ///
    /// # Errors
    ///
    /// Same as [`KvStore::get`], plus [`Error::Task`] if the blocking task
    /// panics or is cancelled.
    pub async fn get_async(&self, key: String) -> Result<Option<Entry>> {
        self.run_blocking(move |store| store.get(&key)).await
    }

    /// Async version of [`KvStore::set`].
    ///
    /// # Errors
    ///
    /// Same as [`KvStore::set`], plus [`Error::Task`].
    pub async fn set_async(
        &self,
        key: String,
        value: Value,
        expires_at: Option<Timestamp>,
    ) -> Result<()> {
        self.run_blocking(move |store| store.set(&key, value, expires_at)).await
    }

    /// Async version of [`KvStore::delete`].
    ///
    /// # Errors
    ///
    /// Same as [`KvStore::delete`], plus [`Error::Task`].
    pub async fn delete_async(&self, key: String) -> Result<bool> {
        self.run_blocking(move |store| store.delete(&key)).await
    }

    /// Async version of [`KvStore::keys`].
    ///
    /// # Errors
    ///
    /// Same as [`KvStore::keys`], plus [`Error::Task`].
    pub async fn keys_async(&self, pattern: String) -> Result<Vec<String>> {
        self.run_blocking(move |store| store.keys(&pattern)).await
    }

    /// Async version of [`KvStore::multi_get`].
    ///
    /// # Errors
    ///
    /// Same as [`KvStore::multi_get`], plus [`Error::Task`].
    pub async fn multi_get_async(
        &self,
        keys: Vec<String>,
    ) -> Result<HashMap<String, Option<Entry>>> {
        self.run_blocking(move |store| store.multi_get(&keys)).await
    }

    /// Async version of [`KvStore::multi_set`].
    ///
    /// # Errors
    ///
    /// Same as [`KvStore::multi_set`], plus [`Error::Task`].
    pub async fn multi_set_async(&self, entries: Vec<Entry>) -> Result<()> {
        self.run_blocking(move |store| store.multi_set(&entries)).await
    }

    /// Async version of [`KvStore::cleanup`].
    ///
    /// # Errors
    ///
    /// Same as [`KvStore::cleanup`], plus [`Error::Task`].
    pub async fn cleanup_async(&self) -> Result<usize> {
        self.run_blocking(KvStore::cleanup).await
    }
}
