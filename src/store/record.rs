//! Single-key record operations.

use super::handle::{KvStore, validate_key};
use super::statements;
use crate::codec;
use crate::error::{Error, Result, ResultExt};
use crate::expiry::{self, Timestamp};
use crate::value::{Entry, Value};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use std::time::Duration;
use tracing::{debug, warn};

impl KvStore {
    /// Retrieves the entry stored under `key`.
    ///
    /// Returns `None` if the key doesn't exist or has expired. An expired
    /// row is deleted as a side effect; if that delete fails the failure is
    /// logged and `None` is still returned.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The row cannot be read
    /// - The stored blob is corrupt ([`Error::Decoding`])
    pub fn get(&self, key: &str) -> Result<Option<Entry>> {
        let conn = self.conn()?;

        let row = conn
            .query_row(statements::GET, params![key], |row| {
                Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Option<Timestamp>>(1)?))
            })
            .optional()
            .with_context(|| format!("Failed to read key '{key}'"))?;

        let Some((encoded, expires_at)) = row else {
            return Ok(None);
        };

        let expires_at = expiry::normalize(expires_at);
        let now = self.clock.now();
        if expiry::is_expired(expires_at, now) {
            Self::expire_lazily(&conn, key, now);
            return Ok(None);
        }

        let value = codec::decode(&encoded).map_err(|e| match e {
            Error::Decoding(msg) => Error::Decoding(format!("key '{key}': {msg}")),
            other => other,
        })?;

        Ok(Some(Entry {
            key: key.to_string(),
            value,
            expires_at,
        }))
    }

    /// Retrieves just the value stored under `key`, converted to `T`.
    ///
    /// # Errors
    ///
    /// Same as [`KvStore::get`], plus [`Error::Decoding`] when the stored
    /// variant does not convert to `T`.
    pub fn get_as<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: TryFrom<Value, Error = Error>,
    {
        self.get(key)?.map(|entry| T::try_from(entry.value)).transpose()
    }

    /// Stores `value` under `key`, replacing any previous value and expiration.
    ///
    /// `expires_at` is an absolute Unix timestamp in seconds; `None` or zero
    /// means the entry never expires.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty, the value cannot be encoded, or
    /// the write fails.
    pub fn set(
        &self,
        key: &str,
        value: impl Into<Value>,
        expires_at: Option<Timestamp>,
    ) -> Result<()> {
        validate_key(key)?;
        let encoded = codec::encode(&value.into())?;
        let expires_at = expiry::normalize(expires_at);

        let conn = self.conn()?;
        conn.execute(statements::SET, params![key, encoded, expires_at])
            .with_context(|| format!("Failed to set key '{key}'"))?;

        debug!(key, ?expires_at, "Set key");
        Ok(())
    }

    /// Stores `value` under `key` with a time-to-live from the store clock's now.
    ///
    /// # Errors
    ///
    /// Same as [`KvStore::set`].
    pub fn set_with_ttl(&self, key: &str, value: impl Into<Value>, ttl: Duration) -> Result<()> {
        let expires_at = expiry::deadline(self.clock.now(), ttl);
        self.set(key, value, Some(expires_at))
    }

    /// Stores a full [`Entry`].
    ///
    /// # Errors
    ///
    /// Same as [`KvStore::set`].
    pub fn set_entry(&self, entry: &Entry) -> Result<()> {
        self.set(&entry.key, entry.value.clone(), entry.expires_at)
    }

    /// Checks whether a row exists for `key`.
    ///
    /// This is a cheap probe: it does not check expiration, so an expired
    /// row that nobody has read or cleaned up yet still reports `true`.
    /// Use [`KvStore::get`] when the answer must honor expiry.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn exists(&self, key: &str) -> Result<bool> {
        let conn = self.conn()?;
        conn.query_row(statements::EXISTS, params![key], |row| row.get::<_, bool>(0))
            .with_context(|| format!("Failed to check key '{key}'"))
    }

    /// Deletes `key`.
    ///
    /// Returns `true` if a row was removed. Idempotent: deleting a missing
    /// key returns `false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn
            .execute(statements::DELETE, params![key])
            .with_context(|| format!("Failed to delete key '{key}'"))?;

        debug!(key, removed = removed > 0, "Deleted key");
        Ok(removed > 0)
    }

    /// Moves the record at `old` to `new`, keeping its value and expiration.
    ///
    /// If `new` holds an expired record it is discarded first. A live record
    /// at `new` is never overwritten.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if `new` is empty
    /// - [`Error::NotFound`] if `old` has no record
    /// - [`Error::ConstraintViolation`] if `new` already holds a live record
    pub fn rename(&self, old: &str, new: &str) -> Result<()> {
        validate_key(new)?;

        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("Failed to begin rename transaction")?;

        if old != new {
            tx.execute(statements::DELETE_IF_EXPIRED, params![new, self.clock.now()])
                .with_context(|| format!("Failed to clear expired key '{new}'"))?;
        }

        let moved = tx
            .execute(statements::RENAME, params![new, old])
            .map_err(|e| match Error::storage(format!("Failed to rename '{old}'"), e) {
                Error::ConstraintViolation(_) => {
                    Error::ConstraintViolation(format!("key '{new}' already exists"))
                },
                other => other,
            })?;

        if moved == 0 {
            return Err(Error::not_found(old));
        }

        tx.commit().context("Failed to commit rename")?;

        debug!(old, new, "Renamed key");
        Ok(())
    }

    /// Returns the expiration stored for `key`.
    ///
    /// `Ok(None)` means the key exists and never expires. The stored value is
    /// reported as-is, even if it is already in the past.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the key has no record.
    pub fn get_expire(&self, key: &str) -> Result<Option<Timestamp>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(statements::GET_EXPIRE, params![key], |row| {
                row.get::<_, Option<Timestamp>>(0)
            })
            .optional()
            .with_context(|| format!("Failed to read expiration of '{key}'"))?;

        match row {
            Some(expires_at) => Ok(expiry::normalize(expires_at)),
            None => Err(Error::not_found(key)),
        }
    }

    /// Time left before `key` expires, from the store clock.
    ///
    /// `Ok(None)` means the key never expires; an already-expired key
    /// reports [`Duration::ZERO`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the key has no record.
    pub fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let expires_at = self.get_expire(key)?;
        Ok(expiry::remaining(expires_at, self.clock.now()))
    }

    /// Replaces only the expiration of `key`. `None` (or zero) removes it.
    ///
    /// Returns `true` if the key existed. A missing key is not an error:
    /// nothing is written and `false` is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn set_expire(&self, key: &str, expires_at: Option<Timestamp>) -> Result<bool> {
        let expires_at = expiry::normalize(expires_at);

        let conn = self.conn()?;
        let updated = conn
            .execute(statements::SET_EXPIRE, params![expires_at, key])
            .with_context(|| format!("Failed to set expiration of '{key}'"))?;

        debug!(key, ?expires_at, updated = updated > 0, "Set expiration");
        Ok(updated > 0)
    }

    /// Removes the expiration of `key` so it never expires.
    ///
    /// # Errors
    ///
    /// Same as [`KvStore::set_expire`].
    pub fn persist(&self, key: &str) -> Result<bool> {
        self.set_expire(key, None)
    }

    /// Best-effort removal of a row found expired during a read.
    fn expire_lazily(conn: &Connection, key: &str, now: Timestamp) {
        match conn.execute(statements::DELETE_IF_EXPIRED, params![key, now]) {
            Ok(_) => debug!(key, "Removed expired key on read"),
            Err(e) => warn!(key, error = %e, "Failed to remove expired key on read"),
        }
    }
}
