//! keystash - command-line access to a keystash database.
//!
//! Every subcommand opens the store, runs one operation and prints the
//! result on stdout. Logs go to stderr.
//!
//! See `keystash --help` for full usage information.

// Use mimalloc for better multi-core performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use keystash::logging::{LogConfig, LogFormat, init_logging};
use keystash::{Entry, KvStore, StoreConfig, Timestamp, Value};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

const AFTER_HELP: &str = "\
PATTERNS:
  Key patterns use SQL LIKE syntax: % matches any run of characters,
  _ matches one character, and \\ escapes the next character.

EXAMPLES:
  keystash set greeting hello              Store a text value
  keystash set session:1 '{\"id\":1}' --json --ttl 3600
  keystash get greeting                    Print a value
  keystash keys 'session:%'                List matching keys
  keystash page --limit 20 --page 2        Second page of all keys
  keystash count --expired                 Expired rows awaiting cleanup
  keystash backup ./snapshots/kv.db        Snapshot the database
  keystash sweep --interval 60             Clean up every minute until Ctrl+C";

#[derive(Parser)]
#[command(name = "keystash")]
#[command(version)]
#[command(about = "Embedded key-value store with per-key expiration")]
#[command(after_help = AFTER_HELP)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database file (default: ~/.keystash/kv.db)
    #[arg(long, global = true, env = "KEYSTASH_DB")]
    db: Option<PathBuf>,

    /// TOML file with store settings; --db overrides its path
    #[arg(long, global = true, env = "KEYSTASH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (pretty, json, compact)
    #[arg(long, global = true, default_value = "compact")]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    // =========================================================================
    // Records
    // =========================================================================
    /// Print the value stored under a key
    Get {
        key: String,
        /// Print structured values as JSON
        #[arg(long)]
        json: bool,
    },
    /// Store a value
    ///
    /// Examples:
    ///   keystash set name alice
    ///   keystash set user:1 '{"name":"alice"}' --json
    ///   keystash set token abc --ttl 300
    Set {
        key: String,
        value: String,
        /// Parse the value as JSON instead of storing it as text
        #[arg(long)]
        json: bool,
        /// Expire after this many seconds
        #[arg(long, conflicts_with = "expires_at")]
        ttl: Option<u64>,
        /// Expire at this Unix timestamp (seconds)
        #[arg(long)]
        expires_at: Option<Timestamp>,
    },
    /// Delete keys
    Del {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Check whether a key has a row (expired or not)
    Exists { key: String },
    /// Move a record to a new key
    Rename { old: String, new: String },
    /// Show when a key expires
    Ttl { key: String },
    /// Change a key's expiration
    ///
    /// Examples:
    ///   keystash expire token 60        # expire in one minute
    ///   keystash expire token --persist # never expire
    Expire {
        key: String,
        /// Seconds from now
        #[arg(required_unless_present = "persist")]
        seconds: Option<u64>,
        /// Remove the expiration
        #[arg(long, conflicts_with = "seconds")]
        persist: bool,
    },

    // =========================================================================
    // Key space
    // =========================================================================
    /// List keys matching a pattern
    Keys {
        #[arg(default_value = "%")]
        pattern: String,
    },
    /// List one page of keys matching a pattern
    Page {
        #[arg(default_value = "%")]
        pattern: String,
        /// Keys per page
        #[arg(short, long, default_value = "20")]
        limit: u32,
        /// Page number, starting at 1
        #[arg(short, long, default_value = "1")]
        page: u32,
    },
    /// Count keys matching a pattern
    Count {
        #[arg(default_value = "%")]
        pattern: String,
        /// Count only expired keys
        #[arg(long)]
        expired: bool,
    },

    // =========================================================================
    // Maintenance
    // =========================================================================
    /// Delete all expired keys
    Cleanup,
    /// Delete all keys
    Flush,
    /// Reclaim unused space in the database file
    Vacuum,
    /// Write a snapshot of the database to a new file
    Backup { path: PathBuf },
    /// Replace the database contents with a snapshot
    Restore { path: PathBuf },
    /// Run periodic cleanup until interrupted
    Sweep {
        /// Seconds between passes (default: sweep_interval_secs from config, else 60)
        #[arg(long)]
        interval: Option<u64>,
    },
}

fn store_config(cli: &Cli) -> Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None if cli.db.is_none() => StoreConfig::default_location()?,
        None => StoreConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.path.clone_from(db);
    }
    Ok(config)
}

fn format_timestamp(ts: Timestamp) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map_or_else(|| ts.to_string(), |dt| dt.to_rfc3339())
}

fn print_value(value: &Value, json: bool) -> Result<()> {
    if json && !value.is_raw() {
        let doc: serde_json::Value = value.deserialize_into()?;
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        println!("{value}");
    }
    Ok(())
}

fn parse_value(raw: String, json: bool) -> Result<Value> {
    if json {
        let doc: serde_json::Value =
            serde_json::from_str(&raw).context("Value is not valid JSON")?;
        Ok(Value::structured(doc))
    } else {
        Ok(Value::Text(raw))
    }
}

async fn sweep(store: &KvStore, interval: Duration) -> Result<()> {
    let removed = store.cleanup_async().await?;
    println!("Initial cleanup removed {removed} expired key(s)");

    let sweeper = store.spawn_sweeper(interval)?;
    println!("Sweeping every {}s, press Ctrl+C to stop", interval.as_secs());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    let passes = sweeper.passes();
    sweeper.shutdown().await?;
    println!("Stopped after {passes} pass(es)");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose().format(cli.log_format)
    } else {
        LogConfig::default().format(cli.log_format)
    };
    init_logging(&log_config);

    let config = store_config(&cli)?;
    let store = KvStore::with_config(&config)
        .with_context(|| format!("Failed to open {}", config.path.display()))?;
    info!(path = %store.path().display(), "Store ready");

    match cli.command {
        // Records
        Commands::Get { key, json } => match store.get(&key)? {
            Some(entry) => print_value(&entry.value, json)?,
            None => bail!("key not found: {key}"),
        },
        Commands::Set {
            key,
            value,
            json,
            ttl,
            expires_at,
        } => {
            let entry = Entry {
                key,
                value: parse_value(value, json)?,
                expires_at,
            };
            match ttl {
                Some(secs) => {
                    store.set_with_ttl(&entry.key, entry.value, Duration::from_secs(secs))?;
                },
                None => store.set_entry(&entry)?,
            }
            println!("OK");
        },
        Commands::Del { keys } => {
            let removed = store.multi_delete(&keys)?;
            println!("{removed}");
        },
        Commands::Exists { key } => {
            println!("{}", store.exists(&key)?);
        },
        Commands::Rename { old, new } => {
            store.rename(&old, &new)?;
            println!("OK");
        },
        Commands::Ttl { key } => match store.get_expire(&key)? {
            Some(ts) => {
                let remaining = keystash::expiry::remaining(Some(ts), store.now())
                    .unwrap_or_default()
                    .as_secs();
                println!("{} ({remaining}s remaining)", format_timestamp(ts));
            },
            None => println!("no expiration"),
        },
        Commands::Expire {
            key,
            seconds,
            persist,
        } => {
            let expires_at = match (persist, seconds) {
                (true, _) | (false, None) => None,
                (false, Some(secs)) => Some(keystash::expiry::deadline(
                    store.now(),
                    Duration::from_secs(secs),
                )),
            };
            if !store.set_expire(&key, expires_at)? {
                bail!("key not found: {key}");
            }
            println!("OK");
        },

        // Key space
        Commands::Keys { pattern } => {
            for key in store.keys(&pattern)? {
                println!("{key}");
            }
        },
        Commands::Page {
            pattern,
            limit,
            page,
        } => {
            for key in store.pagination(limit, page, &pattern)? {
                println!("{key}");
            }
        },
        Commands::Count { pattern, expired } => {
            let count = if expired {
                store.count_expired(&pattern)?
            } else {
                store.count(&pattern)?
            };
            println!("{count}");
        },

        // Maintenance
        Commands::Cleanup => {
            println!("{}", store.cleanup()?);
        },
        Commands::Flush => {
            println!("{}", store.flush()?);
        },
        Commands::Vacuum => {
            store.vacuum()?;
            println!("OK");
        },
        Commands::Backup { path } => {
            store.backup(&path)?;
            println!("Backup written to {}", path.display());
        },
        Commands::Restore { path } => {
            store.restore(&path)?;
            println!("Restored from {}", path.display());
        },
        Commands::Sweep { interval } => {
            let interval = interval
                .map(Duration::from_secs)
                .or_else(|| config.sweep_interval())
                .unwrap_or(Duration::from_secs(60));
            sweep(&store, interval).await?;
        },
    }

    store.close()?;
    Ok(())
}
