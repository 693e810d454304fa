//! Centralized constants for the on-disk format and defaults.
//!
//! Anything that is part of the persisted layout (marker bytes, table and
//! index names) lives here so format changes are made in one place.

// =============================================================================
// Value Encoding
// =============================================================================

/// Marker for raw byte payloads, stored verbatim.
pub const MARKER_RAW: u8 = 0x01;

/// Marker for MessagePack payloads (text, numbers, booleans, structured data).
pub const MARKER_STRUCTURED: u8 = 0x02;

// =============================================================================
// Storage Layout
// =============================================================================

/// Name of the single key-value table.
pub const TABLE_NAME: &str = "keystash";

/// Partial index over non-null expirations.
pub const EXPIRY_INDEX_NAME: &str = "idx_keystash_expires_at";

/// In-memory database path understood by SQLite.
pub const MEMORY_PATH: &str = ":memory:";

/// Data directory under the user's home.
pub const DATA_DIR_NAME: &str = ".keystash";

/// Database file name inside the data directory.
pub const DEFAULT_DB_FILE: &str = "kv.db";

// =============================================================================
// Engine Defaults
// =============================================================================

/// Default journal mode. WAL lets readers proceed while a writer commits.
pub const DEFAULT_JOURNAL_MODE: &str = "WAL";

/// Default synchronous level. NORMAL is durable under WAL except on power loss.
pub const DEFAULT_SYNCHRONOUS: &str = "NORMAL";

/// Default page cache size (64 MB, expressed in KiB).
pub const DEFAULT_CACHE_SIZE_KIB: i64 = 64_000;

/// Default memory-mapped I/O ceiling (30 GB). SQLite clamps it to its compile-time maximum.
pub const DEFAULT_MMAP_SIZE: i64 = 30_000_000_000;

/// Default time to wait on a locked database before failing (5 seconds).
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
