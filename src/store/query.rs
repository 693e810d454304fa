//! Key-space queries: pattern listing, pagination and counts.
//!
//! Patterns use SQL `LIKE` syntax: `%` matches any run of characters, `_`
//! matches exactly one, and `\` escapes the next character. ASCII letters
//! compare case-insensitively, as in SQLite's default `LIKE`. Results are
//! ordered by key.

use super::handle::KvStore;
use super::statements;
use crate::error::{Error, Result, ResultExt};
use rusqlite::{Connection, params};

/// Builds a pattern matching every key that starts with `prefix` literally.
///
/// # Examples
///
/// ```
/// use keystash::prefix_pattern;
///
/// assert_eq!(prefix_pattern("user:"), "user:%");
/// assert_eq!(prefix_pattern("100%_"), "100\\%\\_%");
/// ```
pub fn prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl KvStore {
    /// Lists keys matching `pattern`, ordered by key.
    ///
    /// `pattern` is a SQL `LIKE` pattern with `\` as the escape character,
    /// so a literal backslash must be doubled: pass `c:\\tmp` to match the
    /// key `c:\tmp`, or build the pattern with [`prefix_pattern`].
    ///
    /// Expired rows that have not been cleaned up are included.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;
        collect_keys(&conn, statements::KEYS, params![pattern], pattern)
    }

    /// Lists one page of keys matching `pattern`.
    ///
    /// `page` is 1-indexed; page `n` holds matches `(n-1)*limit+1` through
    /// `n*limit` in key order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `limit` or `page` is zero or the
    /// offset overflows, or a storage error if the query fails.
    pub fn pagination(&self, limit: u32, page: u32, pattern: &str) -> Result<Vec<String>> {
        if limit == 0 {
            return Err(Error::validation("limit must be at least 1"));
        }
        if page == 0 {
            return Err(Error::validation("page must be at least 1 (pages are 1-indexed)"));
        }

        let offset = u64::from(page - 1)
            .checked_mul(u64::from(limit))
            .and_then(|o| i64::try_from(o).ok())
            .ok_or_else(|| Error::validation("page offset is out of range"))?;

        let conn = self.conn()?;
        collect_keys(
            &conn,
            statements::PAGINATION,
            params![pattern, i64::from(limit), offset],
            pattern,
        )
    }

    /// Counts keys matching `pattern`, expired or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count(&self, pattern: &str) -> Result<u64> {
        let conn = self.conn()?;
        let count = conn
            .query_row(statements::COUNT, params![pattern], |row| row.get::<_, i64>(0))
            .with_context(|| format!("Failed to count keys matching '{pattern}'"))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Counts keys matching `pattern` whose expiration has passed.
    ///
    /// Uses the same clock and predicate as [`KvStore::cleanup`], so running
    /// cleanup at the same instant removes exactly this many matching rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_expired(&self, pattern: &str) -> Result<u64> {
        let now = self.clock.now();
        let conn = self.conn()?;
        let count = conn
            .query_row(statements::COUNT_EXPIRED, params![pattern, now], |row| {
                row.get::<_, i64>(0)
            })
            .with_context(|| format!("Failed to count expired keys matching '{pattern}'"))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

fn collect_keys(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
    pattern: &str,
) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare_cached(sql)
        .with_context(|| format!("Failed to prepare query: {sql}"))?;

    let keys = stmt
        .query_map(params, |row| row.get::<_, String>(0))
        .with_context(|| format!("Failed to list keys matching '{pattern}'"))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to fetch keys")?;

    Ok(keys)
}
