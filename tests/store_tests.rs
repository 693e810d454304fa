//! End-to-end tests for the public store API.
//!
//! Every test opens a real database file in a temporary directory, so WAL
//! mode, the expiry index and file-level maintenance are exercised the way
//! an application would use them.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test store_tests
//! ```

use keystash::{Entry, Error, KvStore, ManualClock, StoreConfig, Value};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const NOW: i64 = 1_700_000_000;

// =============================================================================
// Helper Functions
// =============================================================================

fn open_store(tmp: &TempDir) -> (KvStore, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(NOW));
    let store = KvStore::open(tmp.path().join("kv.db"))
        .unwrap()
        .with_clock(clock.clone());
    (store, clock)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    age: u32,
    tags: Vec<String>,
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_delete_then_list() {
    let tmp = TempDir::new().unwrap();
    let (store, _clock) = open_store(&tmp);

    store.set("a", "1", None).unwrap();
    store.set("b", "2", None).unwrap();
    store.delete("a").unwrap();

    assert_eq!(store.keys("%").unwrap(), vec!["b"]);
}

#[test]
fn test_expired_read_then_cleanup_counts() {
    let tmp = TempDir::new().unwrap();
    let (store, _clock) = open_store(&tmp);

    store.set("x", "v", Some(NOW - 1)).unwrap();
    store.set("y", "v", Some(NOW - 1)).unwrap();
    store.set("z", "v", None).unwrap();

    assert!(store.get("x").unwrap().is_none());

    // "x" was removed by the read; "y" is still waiting for cleanup
    let before = store.count("%").unwrap();
    let expired = store.count_expired("%").unwrap();
    store.cleanup().unwrap();
    let after = store.count("%").unwrap();

    assert_eq!(before, 2);
    assert_eq!(expired, 1);
    assert_eq!(before - after, expired);
}

#[test]
fn test_pagination_second_page_of_prefix() {
    let tmp = TempDir::new().unwrap();
    let (store, _clock) = open_store(&tmp);

    let entries: Vec<Entry> = (0..25)
        .map(|i| Entry::new(format!("user:{i:02}"), i))
        .chain((0..5).map(|i| Entry::new(format!("admin:{i}"), i)))
        .collect();
    store.multi_set(&entries).unwrap();

    let page = store.pagination(10, 2, "user:%").unwrap();
    let expected: Vec<String> = (10..20).map(|i| format!("user:{i:02}")).collect();
    assert_eq!(page, expected);

    assert!(matches!(store.pagination(10, 0, "user:%"), Err(Error::Validation(_))));
    assert!(matches!(store.pagination(0, 2, "user:%"), Err(Error::Validation(_))));
}

#[test]
fn test_cleanup_leaves_unexpired_untouched() {
    let tmp = TempDir::new().unwrap();
    let (store, clock) = open_store(&tmp);

    store.set("soon", 1, Some(NOW + 10)).unwrap();
    store.set("later", 2, Some(NOW + 1_000)).unwrap();
    store.set("never", 3, None).unwrap();
    store.set("zero", 4, Some(0)).unwrap();

    clock.advance(Duration::from_secs(10));
    assert_eq!(store.cleanup().unwrap(), 1);
    assert_eq!(store.keys("%").unwrap(), vec!["later", "never", "zero"]);
}

// =============================================================================
// Values
// =============================================================================

#[test]
fn test_every_variant_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("kv.db");

    let values = vec![
        ("raw", Value::Raw(vec![])),
        ("raw_all", Value::Raw((0..=255).collect())),
        ("text", Value::Text("héllo wörld".to_string())),
        ("int", Value::Integer(i64::MIN)),
        ("float", Value::Float(-0.5)),
        ("bool", Value::Boolean(true)),
        ("doc", Value::structured(json!({"a": [1, null, "x"], "b": {"c": 2.5}}))),
        ("null", Value::structured(json!(null))),
    ];

    {
        let store = KvStore::open(&path).unwrap();
        for (key, value) in &values {
            store.set(key, value.clone(), None).unwrap();
        }
        store.close().unwrap();
    }

    let store = KvStore::open(&path).unwrap();
    for (key, value) in values {
        let entry = store.get(key).unwrap().unwrap();
        assert_eq!(entry.value, value, "value for {key}");
        assert!(store.exists(key).unwrap());
    }
}

#[test]
fn test_serde_types_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let (store, _clock) = open_store(&tmp);

    let profile = Profile {
        name: "alice".to_string(),
        age: 30,
        tags: vec!["admin".to_string()],
    };
    store
        .set("profile:alice", Value::from_serializable(&profile).unwrap(), None)
        .unwrap();

    let entry = store.get("profile:alice").unwrap().unwrap();
    assert_eq!(entry.value.deserialize_into::<Profile>().unwrap(), profile);
}

// =============================================================================
// Batch atomicity
// =============================================================================

#[test]
fn test_multi_set_failure_leaves_store_unchanged() {
    let tmp = TempDir::new().unwrap();
    let (store, _clock) = open_store(&tmp);
    store.set("keep", "original", None).unwrap();

    let batch = vec![
        Entry::new("keep", "overwritten"),
        Entry::new("fresh", 1),
        Entry::new("", "invalid"),
    ];
    assert!(store.multi_set(&batch).is_err());

    assert_eq!(store.count("%").unwrap(), 1);
    assert_eq!(
        store.get_as::<String>("keep").unwrap().as_deref(),
        Some("original")
    );
}

#[test]
fn test_multi_delete_counts_removed() {
    let tmp = TempDir::new().unwrap();
    let (store, _clock) = open_store(&tmp);

    store
        .multi_set(&[Entry::new("a", 1), Entry::new("b", 2), Entry::new("c", 3)])
        .unwrap();
    assert_eq!(store.multi_delete(&["a", "c", "zzz"]).unwrap(), 2);
    assert_eq!(store.keys("%").unwrap(), vec!["b"]);
}

// =============================================================================
// Handles and concurrency
// =============================================================================

#[test]
fn test_two_handles_on_one_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("shared.db");

    let writer = KvStore::open(&path).unwrap();
    let reader = KvStore::open(&path).unwrap();

    writer.set("key1", "value1", None).unwrap();
    assert_eq!(
        reader.get_as::<String>("key1").unwrap().as_deref(),
        Some("value1")
    );
}

#[test]
fn test_parallel_readers_and_writers() {
    let tmp = TempDir::new().unwrap();
    let (store, _clock) = open_store(&tmp);

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let store = store.clone();
            std::thread::spawn(move || {
                let batch: Vec<Entry> = (0..25)
                    .map(|i| Entry::new(format!("w{t}:{i:02}"), i))
                    .collect();
                store.multi_set(&batch).unwrap();
            })
        })
        .collect();
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..25 {
                    let count = store.count("w%").unwrap();
                    // Batches land whole
                    assert_eq!(count % 25, 0);
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().unwrap();
    }
    assert_eq!(store.count("w%").unwrap(), 100);
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_open_from_toml_config() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("data").join("kv.db");
    let config_path = tmp.path().join("keystash.toml");
    std::fs::write(
        &config_path,
        format!(
            "path = {:?}\nsynchronous = \"FULL\"\nbusy_timeout_ms = 250\n",
            db_path.display().to_string()
        ),
    )
    .unwrap();

    let config = StoreConfig::load_from(&config_path).unwrap();
    let store = KvStore::with_config(&config).unwrap();
    store.set("k", "v", None).unwrap();

    assert!(db_path.exists());
}

// =============================================================================
// Backup and restore
// =============================================================================

#[test]
fn test_backup_restore_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let (store, _clock) = open_store(&tmp);
    let snapshot = tmp.path().join("snap.db");

    store.set("a", 1, None).unwrap();
    store.set("b", 2, Some(NOW + 100)).unwrap();
    store.backup(&snapshot).unwrap();

    store.flush().unwrap();
    store.set("c", 3, None).unwrap();
    store.restore(&snapshot).unwrap();

    assert_eq!(store.keys("%").unwrap(), vec!["a", "b"]);
    assert_eq!(store.get_expire("b").unwrap(), Some(NOW + 100));

    // A second backup to the same path is refused
    assert!(matches!(store.backup(&snapshot), Err(Error::Validation(_))));
}

// =============================================================================
// Async
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_async_sets() {
    let tmp = TempDir::new().unwrap();
    let (store, _clock) = open_store(&tmp);

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .set_async(format!("k{i:02}"), Value::Integer(i), None)
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let keys = store.keys_async("k%".to_string()).await.unwrap();
    assert_eq!(keys.len(), 20);
}

#[tokio::test]
async fn test_sweeper_shutdown_is_clean() {
    let tmp = TempDir::new().unwrap();
    let (store, clock) = open_store(&tmp);

    store.set("gone", 1, Some(NOW + 1)).unwrap();
    store.set("kept", 2, None).unwrap();
    clock.advance(Duration::from_secs(5));

    let sweeper = store.spawn_sweeper(Duration::from_millis(20)).unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while store.exists("gone").unwrap() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("sweeper should remove expired key");

    sweeper.shutdown().await.unwrap();
    assert_eq!(store.keys("%").unwrap(), vec!["kept"]);
}
