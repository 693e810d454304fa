//! SQL used by the store.
//!
//! Pattern queries always evaluate `LIKE` with `ESCAPE '\'`, so a backslash
//! in a pattern escapes the following `%`, `_` or `\`.

/// Table and partial expiry index.
pub(super) const CREATE_SCHEMA: &str = "\
    CREATE TABLE IF NOT EXISTS keystash (
        key TEXT PRIMARY KEY NOT NULL,
        value BLOB NOT NULL,
        expires_at INTEGER
    ) WITHOUT ROWID;
    CREATE INDEX IF NOT EXISTS idx_keystash_expires_at
        ON keystash(expires_at) WHERE expires_at IS NOT NULL;";

// =============================================================================
// Single-key
// =============================================================================

pub(super) const GET: &str = "SELECT value, expires_at FROM keystash WHERE key = ?1";

pub(super) const SET: &str =
    "INSERT OR REPLACE INTO keystash (key, value, expires_at) VALUES (?1, ?2, ?3)";

pub(super) const DELETE: &str = "DELETE FROM keystash WHERE key = ?1";

/// Deletes only if the row is still expired at `?2`, so a concurrent
/// overwrite is never removed by a stale lazy-expiry decision.
pub(super) const DELETE_IF_EXPIRED: &str = "\
    DELETE FROM keystash
    WHERE key = ?1 AND expires_at IS NOT NULL AND expires_at <= ?2";

pub(super) const EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM keystash WHERE key = ?1)";

pub(super) const RENAME: &str = "UPDATE keystash SET key = ?1 WHERE key = ?2";

pub(super) const GET_EXPIRE: &str = "SELECT expires_at FROM keystash WHERE key = ?1";

pub(super) const SET_EXPIRE: &str = "UPDATE keystash SET expires_at = ?1 WHERE key = ?2";

// =============================================================================
// Key-space
// =============================================================================

pub(super) const KEYS: &str =
    "SELECT key FROM keystash WHERE key LIKE ?1 ESCAPE '\\' ORDER BY key";

pub(super) const PAGINATION: &str =
    "SELECT key FROM keystash WHERE key LIKE ?1 ESCAPE '\\' ORDER BY key LIMIT ?2 OFFSET ?3";

pub(super) const COUNT: &str = "SELECT COUNT(*) FROM keystash WHERE key LIKE ?1 ESCAPE '\\'";

/// Same expiry predicate as [`CLEANUP`]; `?2` is the caller's "now" in seconds.
pub(super) const COUNT_EXPIRED: &str = "\
    SELECT COUNT(*) FROM keystash
    WHERE expires_at IS NOT NULL AND expires_at <= ?2 AND key LIKE ?1 ESCAPE '\\'";

// =============================================================================
// Maintenance
// =============================================================================

pub(super) const CLEANUP: &str =
    "DELETE FROM keystash WHERE expires_at IS NOT NULL AND expires_at <= ?1";

pub(super) const FLUSH: &str = "DELETE FROM keystash";

pub(super) const VACUUM: &str = "VACUUM";

/// Writes a transactionally consistent copy of the database to `?1`.
pub(super) const BACKUP: &str = "VACUUM INTO ?1";

/// Column names of the key-value table; empty when the table is missing.
pub(super) const TABLE_COLUMNS: &str = "SELECT name FROM pragma_table_info('keystash')";

/// Columns a backup must carry before it may replace the live store.
pub(super) const REQUIRED_COLUMNS: [&str; 3] = ["key", "value", "expires_at"];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{EXPIRY_INDEX_NAME, TABLE_NAME};

    #[test]
    fn test_statements_target_configured_table() {
        for sql in [
            GET,
            SET,
            DELETE,
            DELETE_IF_EXPIRED,
            EXISTS,
            RENAME,
            GET_EXPIRE,
            SET_EXPIRE,
            KEYS,
            PAGINATION,
            COUNT,
            COUNT_EXPIRED,
            CLEANUP,
            FLUSH,
            TABLE_COLUMNS,
        ] {
            assert!(sql.contains(TABLE_NAME), "statement misses table: {sql}");
        }
        assert!(CREATE_SCHEMA.contains(EXPIRY_INDEX_NAME));
    }

    #[test]
    fn test_cleanup_and_count_share_predicate() {
        let predicate = "expires_at IS NOT NULL AND expires_at <=";
        assert!(CLEANUP.contains(predicate));
        assert!(COUNT_EXPIRED.contains(predicate));
    }
}
