//! Multi-key operations.
//!
//! Writes run in one immediate transaction: every entry lands or none do.
//! Reads are a loop over [`KvStore::get`] and make no atomicity promise.

use super::handle::{KvStore, validate_key};
use super::statements;
use crate::codec;
use crate::error::{Result, ResultExt};
use crate::expiry;
use crate::value::Entry;
use rusqlite::{TransactionBehavior, params};
use std::collections::HashMap;
use tracing::debug;

impl KvStore {
    /// Reads several keys.
    ///
    /// Each key is an independent [`KvStore::get`]: expired keys are removed
    /// as they are visited, and a concurrent writer may be observed between
    /// two keys of the same call. Every requested key appears in the result,
    /// mapped to `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns the first read or decode error; earlier lazy deletions are
    /// not undone.
    pub fn multi_get<K: AsRef<str>>(&self, keys: &[K]) -> Result<HashMap<String, Option<Entry>>> {
        let mut result = HashMap::with_capacity(keys.len());
        for key in keys {
            let key = key.as_ref();
            result.insert(key.to_string(), self.get(key)?);
        }
        Ok(result)
    }

    /// Stores every entry atomically.
    ///
    /// # Errors
    ///
    /// Returns the first validation, encoding or write error. The transaction
    /// is rolled back, so no entry from the batch is persisted.
    pub fn multi_set(&self, entries: &[Entry]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("Failed to begin multi-set transaction")?;

        {
            let mut stmt = tx
                .prepare_cached(statements::SET)
                .context("Failed to prepare multi-set statement")?;

            for entry in entries {
                validate_key(&entry.key)?;
                let encoded = codec::encode(&entry.value)?;
                let expires_at = expiry::normalize(entry.expires_at);
                stmt.execute(params![entry.key, encoded, expires_at])
                    .with_context(|| format!("Failed to set key '{}'", entry.key))?;
            }
        }

        tx.commit().context("Failed to commit multi-set")?;

        debug!(count = entries.len(), "Stored batch");
        Ok(())
    }

    /// Deletes every key atomically, returning how many rows were removed.
    ///
    /// # Errors
    ///
    /// Returns the first delete error; the transaction is rolled back.
    pub fn multi_delete<K: AsRef<str>>(&self, keys: &[K]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("Failed to begin multi-delete transaction")?;

        let mut removed = 0;
        {
            let mut stmt = tx
                .prepare_cached(statements::DELETE)
                .context("Failed to prepare multi-delete statement")?;

            for key in keys {
                let key = key.as_ref();
                removed += stmt
                    .execute(params![key])
                    .with_context(|| format!("Failed to delete key '{key}'"))?;
            }
        }

        tx.commit().context("Failed to commit multi-delete")?;

        debug!(requested = keys.len(), removed, "Deleted batch");
        Ok(removed)
    }
}
