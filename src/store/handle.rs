//! `KvStore` handle: opening, schema setup and connection access.

use super::statements;
use crate::config::StoreConfig;
use crate::error::{Error, Result, ResultExt};
use crate::expiry::{Clock, SystemClock};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Key-value store backed by a single SQLite table.
///
/// Values are encoded by [`crate::codec`]; expirations follow
/// [`crate::expiry`]. Operations are synchronous. See the `*_async`
/// methods for use from async contexts.
///
/// # Thread Safety
///
/// `KvStore` is `Clone` and can be shared across threads. Clones share one
/// connection guarded by a mutex, so every operation is serialized in this
/// process; SQLite's locking covers other processes on the same file.
#[derive(Clone)]
pub struct KvStore {
    pub(super) conn: Arc<Mutex<Connection>>,
    pub(super) clock: Arc<dyn Clock>,
    path: PathBuf,
}

impl KvStore {
    /// Opens the default store at `~/.keystash/kv.db`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or the
    /// database cannot be opened.
    pub fn open_default() -> Result<Self> {
        Self::with_config(&StoreConfig::default_location()?)
    }

    /// Opens or creates a store at `path` with default settings.
    ///
    /// Creates parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Parent directory cannot be created
    /// - Database file cannot be opened (permissions, corruption, etc.)
    /// - The schema cannot be created
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_config(&StoreConfig::new(path.as_ref()))
    }

    /// Opens a private in-memory store. Contents vanish when the last clone drops.
    pub fn memory() -> Result<Self> {
        Self::with_config(&StoreConfig::memory())
    }

    /// Opens a store with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the database cannot
    /// be opened, or pragma/schema setup fails.
    pub fn with_config(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let conn = if config.is_memory() {
            Connection::open_in_memory().context("Failed to open in-memory database")?
        } else {
            let path = config.path.as_path();

            // Ensure parent directory exists before opening database
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::io(format!("creating database directory {}", parent.display()), e)
                })?;
            }

            Connection::open(path)
                .with_context(|| format!("Failed to open database: {}", path.display()))?
        };

        conn.busy_timeout(config.busy_timeout())
            .context("Failed to set busy timeout")?;
        conn.execute_batch(&config.pragma_sql())
            .context("Failed to apply pragmas")?;
        conn.execute_batch(statements::CREATE_SCHEMA)
            .context("Failed to create schema")?;

        info!(path = %config.path.display(), "Opened key-value store");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            clock: Arc::new(SystemClock),
            path: config.path.clone(),
        })
    }

    /// Replaces the clock used for every expiry decision.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the database path (`:memory:` for in-memory stores).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current time according to the store's clock.
    pub fn now(&self) -> crate::expiry::Timestamp {
        self.clock.now()
    }

    /// Acquires the shared connection for one unit of work.
    pub(super) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::Poisoned(format!("Failed to acquire database lock: {e}")))
    }

    /// Closes the store.
    ///
    /// The connection is closed when this is the last handle; otherwise the
    /// remaining clones keep it open and this handle is simply dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite fails to close the connection (for example
    /// while a statement is still being finalized).
    pub fn close(self) -> Result<()> {
        match Arc::try_unwrap(self.conn) {
            Ok(mutex) => {
                let conn = mutex
                    .into_inner()
                    .map_err(|e| Error::Poisoned(format!("Failed to close database: {e}")))?;
                conn.close()
                    .map_err(|(_, e)| Error::storage("Failed to close database", e))?;
                info!(path = %self.path.display(), "Closed key-value store");
            },
            Err(_) => {
                debug!(path = %self.path.display(), "Store still shared, leaving connection open");
            },
        }
        Ok(())
    }
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore")
            .field("path", &self.path)
            .field("handles", &Arc::strong_count(&self.conn))
            .finish_non_exhaustive()
    }
}

/// Rejects keys that cannot identify a record.
pub(super) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::validation("key cannot be empty"));
    }
    Ok(())
}
