// =============================================================================
// Lint Configuration
// =============================================================================

#![deny(unsafe_code)]
// Correctness: Must handle all fallible operations
#![deny(unused_must_use)]
// Quality: Pedantic but pragmatic
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(rust_2018_idioms)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
// Allowed with documented reasons
#![allow(clippy::missing_errors_doc)] // Error returns self-documenting via type
#![allow(clippy::module_name_repetitions)] // e.g., store::KvStore is clearer
#![allow(clippy::doc_markdown)] // Too many false positives in code docs
#![allow(clippy::must_use_candidate)] // Not all returned values need annotation
#![allow(clippy::cast_possible_truncation)] // Row counts fit in usize
#![allow(clippy::cast_sign_loss)] // SQLite counts are never negative

//! keystash - embedded key-value store with per-key expiration.
//!
//! Records live in a single SQLite table. Each record has a text key, a
//! value and an optional expiration time in Unix seconds. Expired records
//! are invisible to reads and are removed lazily on read, by an explicit
//! [`KvStore::cleanup`], or by an opt-in background sweeper.
//!
//! # Example
//!
//! ```
//! use keystash::{KvStore, Value};
//! use std::time::Duration;
//!
//! # fn main() -> keystash::Result<()> {
//! let store = KvStore::memory()?;
//!
//! store.set("greeting", "hello", None)?;
//! store.set_with_ttl("session:1", 42, Duration::from_secs(60))?;
//!
//! let entry = store.get("greeting")?.expect("just stored");
//! assert_eq!(entry.value, Value::Text("hello".to_string()));
//! assert_eq!(store.keys("session:%")?, vec!["session:1"]);
//! # Ok(())
//! # }
//! ```

/// Value encoding: a one-byte marker followed by raw bytes or MessagePack.
pub mod codec;

/// Store configuration, loadable from TOML.
///
/// # Example
///
/// ```
/// use keystash::StoreConfig;
///
/// let config: StoreConfig = toml::from_str(r#"
/// path = "data/kv.db"
/// synchronous = "FULL"
/// "#).unwrap();
///
/// assert_eq!(config.journal_mode, "WAL");
/// assert!(config.validate().is_ok());
/// ```
pub mod config;

/// Centralized constants: wire markers, schema names and engine defaults.
pub mod constants;

pub mod error;

/// Expiration policy and the injectable clock.
pub mod expiry;

/// Tracing subscriber setup for binaries embedding the store.
pub mod logging;

/// The SQLite-backed store.
pub mod store;

pub mod value;

pub use config::StoreConfig;
pub use error::{Error, Result};
pub use expiry::{Clock, ManualClock, SystemClock, Timestamp};
pub use store::{KvStore, SweeperHandle, prefix_pattern};
pub use value::{Entry, Value};
