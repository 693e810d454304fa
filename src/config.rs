//! Store configuration.
//!
//! Settings can be built in code or loaded from a TOML file:
//!
//! ```toml
//! path = "/var/lib/app/kv.db"
//! journal_mode = "WAL"
//! synchronous = "NORMAL"
//! cache_size_kib = 64000
//! busy_timeout_ms = 5000
//! sweep_interval_secs = 60
//! ```
//!
//! Every field is optional; missing fields take the defaults from
//! [`crate::constants`].

use crate::constants;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Journal modes accepted by `PRAGMA journal_mode`.
const JOURNAL_MODES: &[&str] = &["DELETE", "TRUNCATE", "PERSIST", "MEMORY", "WAL", "OFF"];

/// Levels accepted by `PRAGMA synchronous`.
const SYNCHRONOUS_LEVELS: &[&str] = &["OFF", "NORMAL", "FULL", "EXTRA"];

/// Configuration for opening a [`crate::KvStore`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Database file. `:memory:` opens a private in-memory database.
    pub path: PathBuf,
    /// `PRAGMA journal_mode`.
    pub journal_mode: String,
    /// `PRAGMA synchronous`.
    pub synchronous: String,
    /// Page cache size in KiB.
    pub cache_size_kib: i64,
    /// `PRAGMA mmap_size` in bytes. Zero disables memory-mapped I/O.
    pub mmap_size: i64,
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout_ms: u64,
    /// Interval for the background sweeper. `None` leaves cleanup to callers.
    pub sweep_interval_secs: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(constants::DEFAULT_DB_FILE),
            journal_mode: constants::DEFAULT_JOURNAL_MODE.to_string(),
            synchronous: constants::DEFAULT_SYNCHRONOUS.to_string(),
            cache_size_kib: constants::DEFAULT_CACHE_SIZE_KIB,
            mmap_size: constants::DEFAULT_MMAP_SIZE,
            busy_timeout_ms: constants::DEFAULT_BUSY_TIMEOUT_MS,
            sweep_interval_secs: None,
        }
    }
}

impl StoreConfig {
    /// Default settings for a database at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Default settings for a private in-memory database.
    pub fn memory() -> Self {
        Self::new(constants::MEMORY_PATH)
    }

    /// Default settings at `~/.keystash/kv.db`.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(data_dir()?.join(constants::DEFAULT_DB_FILE)))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The file contains invalid TOML or unknown fields
    /// - The loaded values fail [`StoreConfig::validate`]
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::io(format!("reading config file {}", path.display()), e)
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("failed to parse {}: {e}", path.display()))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check values that SQLite would otherwise reject at open time.
    ///
    /// Pragma values are interpolated into SQL, so only the known keywords
    /// are accepted.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push("path cannot be empty".to_string());
        }

        if !JOURNAL_MODES.contains(&self.journal_mode.to_ascii_uppercase().as_str()) {
            errors.push(format!(
                "journal_mode must be one of {JOURNAL_MODES:?} (got: '{}')",
                self.journal_mode
            ));
        }

        if !SYNCHRONOUS_LEVELS.contains(&self.synchronous.to_ascii_uppercase().as_str()) {
            errors.push(format!(
                "synchronous must be one of {SYNCHRONOUS_LEVELS:?} (got: '{}')",
                self.synchronous
            ));
        }

        if self.mmap_size < 0 {
            errors.push("mmap_size cannot be negative".to_string());
        }

        if self.sweep_interval_secs == Some(0) {
            errors.push("sweep_interval_secs must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(errors.join("; ")))
        }
    }

    /// True when the configured path is SQLite's in-memory marker.
    pub fn is_memory(&self) -> bool {
        self.path.as_os_str() == constants::MEMORY_PATH
    }

    /// Busy timeout as a [`Duration`].
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Sweep interval as a [`Duration`], if one is configured.
    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs.map(Duration::from_secs)
    }

    /// Pragma batch applied right after the connection opens.
    pub(crate) fn pragma_sql(&self) -> String {
        format!(
            "PRAGMA journal_mode = {};\n\
             PRAGMA synchronous = {};\n\
             PRAGMA temp_store = MEMORY;\n\
             PRAGMA cache_size = -{};\n\
             PRAGMA mmap_size = {};",
            self.journal_mode.to_ascii_uppercase(),
            self.synchronous.to_ascii_uppercase(),
            self.cache_size_kib.unsigned_abs(),
            self.mmap_size,
        )
    }
}

/// Base directory for keystash data (`~/.keystash`), created on demand.
pub fn data_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| Error::Config("failed to determine home directory".to_string()))?;
    let data_dir = home.join(constants::DATA_DIR_NAME);
    fs::create_dir_all(&data_dir).map_err(|e| {
        Error::io(format!("creating data directory {}", data_dir.display()), e)
    })?;
    Ok(data_dir)
}
