//! Bulk maintenance: expiry cleanup, flush, vacuum, backup and restore.

use super::handle::KvStore;
use super::statements;
use crate::error::{Error, Result, ResultExt};
use rusqlite::backup::Progress;
use rusqlite::{Connection, DatabaseName, OpenFlags, params};
use std::path::Path;
use tracing::info;

impl KvStore {
    /// Deletes every record whose expiration is at or before now.
    ///
    /// "Now" is read once from the store clock and bound into a single
    /// statement, so every row is judged against the same instant.
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn cleanup(&self) -> Result<usize> {
        let now = self.clock.now();
        let conn = self.conn()?;
        let removed = conn
            .execute(statements::CLEANUP, params![now])
            .context("Failed to clean up expired keys")?;

        info!(removed, now, "Cleaned up expired keys");
        Ok(removed)
    }

    /// Deletes every record. Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn flush(&self) -> Result<usize> {
        let conn = self.conn()?;
        let removed = conn
            .execute(statements::FLUSH, [])
            .context("Failed to flush store")?;

        info!(removed, "Flushed store");
        Ok(removed)
    }

    /// Rebuilds the database file to reclaim free pages.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot vacuum (for example while another
    /// connection holds a read transaction).
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn vacuum(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(statements::VACUUM)
            .context("Failed to vacuum database")?;

        info!("Vacuumed database");
        Ok(())
    }

    /// Writes a consistent snapshot of the store to a new database file.
    ///
    /// The copy is produced by one `VACUUM INTO` statement, which reads
    /// inside a single transaction; concurrent writers are either fully in
    /// the snapshot or fully absent. The result is a regular SQLite file
    /// that [`KvStore::open`] or [`KvStore::restore`] accepts.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if `path` already exists or is not UTF-8
    /// - [`Error::Io`] if the parent directory cannot be created
    /// - a storage error if the snapshot fails
    #[tracing::instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn backup<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if path.exists() {
            return Err(Error::validation(format!(
                "backup target already exists: {}",
                path.display()
            )));
        }
        let target = path.to_str().ok_or_else(|| {
            Error::validation(format!("backup path is not valid UTF-8: {}", path.display()))
        })?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::io(format!("creating backup directory {}", parent.display()), e)
            })?;
        }

        let conn = self.conn()?;
        conn.execute(statements::BACKUP, params![target])
            .with_context(|| format!("Failed to back up to {}", path.display()))?;

        info!("Backup completed");
        Ok(())
    }

    /// Replaces the store's contents with those of a backup file.
    ///
    /// Uses SQLite's online backup API while holding the connection, so no
    /// other operation on this handle observes a partial restore. The file
    /// is opened read-only and checked first; the live store is untouched
    /// unless it carries the key-value table.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if `path` does not exist
    /// - [`Error::Validation`] if the file lacks the key-value table or one
    ///   of its columns
    /// - a storage error if the file is not a readable database
    #[tracing::instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn restore<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(Error::io(
                format!("opening backup {}", path.display()),
                std::io::Error::new(std::io::ErrorKind::NotFound, "backup file not found"),
            ));
        }

        check_backup_schema(path)?;

        let mut conn = self.conn()?;
        conn.restore(DatabaseName::Main, path, None::<fn(Progress)>)
            .with_context(|| format!("Failed to restore from {}", path.display()))?;

        // Backups taken by older schemas may lack the index
        conn.execute_batch(statements::CREATE_SCHEMA)
            .context("Failed to verify schema after restore")?;

        info!("Restore completed");
        Ok(())
    }
}

/// Rejects a backup file that does not hold a keystash table.
fn check_backup_schema(path: &Path) -> Result<()> {
    let source = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("Failed to open backup {}", path.display()))?;

    let mut stmt = source
        .prepare(statements::TABLE_COLUMNS)
        .with_context(|| format!("Failed to read schema of {}", path.display()))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .with_context(|| format!("Failed to read schema of {}", path.display()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to fetch backup columns")?;

    let missing: Vec<&str> = statements::REQUIRED_COLUMNS
        .into_iter()
        .filter(|required| !columns.iter().any(|c| c == required))
        .collect();
    if !missing.is_empty() {
        return Err(Error::validation(format!(
            "{} is not a keystash backup (missing columns: {})",
            path.display(),
            missing.join(", ")
        )));
    }
    Ok(())
}
