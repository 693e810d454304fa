//! Key-value store backed by SQLite.
//!
//! One table holds every record: a text key, the encoded value blob and an
//! optional expiration in Unix seconds. Stores data at `~/.keystash/kv.db`
//! by default.
//!
//! Features:
//! - Get/set/delete/rename with per-key expiration
//! - Lazy expiry on read plus explicit (or opt-in periodic) cleanup
//! - `LIKE` pattern listing, pagination and counts
//! - Atomic multi-set and multi-delete
//! - Backup to and restore from plain SQLite files
//!
//! # Async Usage
//!
//! All database operations are blocking. When using from async contexts,
//! use the async methods (`get_async`, `set_async`, etc.) which run the
//! operation on tokio's blocking pool.

mod async_ops;
mod batch;
mod handle;
mod maintenance;
mod query;
mod record;
mod statements;
mod sweeper;


pub use handle::KvStore;
pub use query::prefix_pattern;
pub use sweeper::SweeperHandle;
