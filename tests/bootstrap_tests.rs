//! Tests for catalog bootstrap on the filesystem store
//!
//! These tests verify:
//! - Scanning a directory of records with no catalog snapshot
//! - Equivalence of scanned and hand-written catalogs
//! - Fail-fast and skip policies for corrupt records
//! - Interrupted writes never damage the previous record

use std::fs;
use std::path::Path;

use cellar::catalog::CATALOG_FILENAME;
use cellar::record::encode_record;
use cellar::{
    BootstrapPolicy, CellarError, Collection, FsRecordStore, IdGenerator, Record, RecordStore,
    SyncStrategy,
};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn open_store(path: &Path) -> FsRecordStore {
    FsRecordStore::open(path, SyncStrategy::EveryWrite).unwrap()
}

fn open_collection(
    path: &Path,
    policy: BootstrapPolicy,
) -> cellar::Result<Collection<FsRecordStore>> {
    Collection::with_options(open_store(path), IdGenerator::default(), policy)
}

/// Write records straight through the store, bypassing any catalog
fn seed_records(path: &Path, count: usize) -> Vec<Record> {
    let mut store = open_store(path);
    let records: Vec<Record> = (0..count)
        .map(|i| {
            Record::new(
                format!("id{:03}", i),
                format!("key{}", i),
                format!("value{}", i).into_bytes(),
                i % 3 == 0,
            )
        })
        .collect();

    for record in &records {
        let location = store.make_record_location(&record.id);
        store.write(&location, record).unwrap();
    }

    records
}

fn sorted_keys(collection: &Collection<FsRecordStore>) -> Vec<String> {
    let mut keys: Vec<String> = collection.keys().map(str::to_string).collect();
    keys.sort();
    keys
}

// =============================================================================
// Scan Tests
// =============================================================================

#[test]
fn test_open_empty_directory_writes_empty_catalog() {
    let temp_dir = TempDir::new().unwrap();

    let collection = open_collection(temp_dir.path(), BootstrapPolicy::FailFast).unwrap();

    assert!(collection.is_empty());
    assert!(!collection.bootstrap().from_snapshot);
    assert!(temp_dir.path().join(CATALOG_FILENAME).is_file());
}

#[test]
fn test_scan_indexes_all_records_and_warms_cache() {
    let temp_dir = TempDir::new().unwrap();
    let records = seed_records(temp_dir.path(), 10);

    let mut collection = open_collection(temp_dir.path(), BootstrapPolicy::FailFast).unwrap();

    assert_eq!(collection.bootstrap().records_indexed, 10);
    assert_eq!(collection.len(), 10);
    assert_eq!(collection.cached_keys().count(), 4); // ids 0, 3, 6, 9

    for record in &records {
        assert_eq!(collection.record_id(&record.key), Some(record.id.as_str()));
        assert_eq!(collection.get(&record.key).unwrap(), record.value);
    }
}

#[test]
fn test_scan_persists_snapshot_for_next_open() {
    let temp_dir = TempDir::new().unwrap();
    seed_records(temp_dir.path(), 5);

    let first = open_collection(temp_dir.path(), BootstrapPolicy::FailFast).unwrap();
    assert!(!first.bootstrap().from_snapshot);
    drop(first);

    let second = open_collection(temp_dir.path(), BootstrapPolicy::FailFast).unwrap();
    assert!(second.bootstrap().from_snapshot);
    assert_eq!(second.len(), 5);
}

#[test]
fn test_scan_equals_hand_written_catalog() {
    let scanned_dir = TempDir::new().unwrap();
    let snapshot_dir = TempDir::new().unwrap();
    let records = seed_records(scanned_dir.path(), 6);
    seed_records(snapshot_dir.path(), 6);

    let entries: Vec<String> = records
        .iter()
        .map(|r| {
            format!(
                r#""{k}": {{"key": "{k}", "fileID": "{id}", "cacheable": {c}}}"#,
                k = r.key,
                id = r.id,
                c = r.cacheable
            )
        })
        .collect();
    let snapshot = format!(r#"{{"entries": {{{}}}}}"#, entries.join(","));
    fs::write(snapshot_dir.path().join(CATALOG_FILENAME), snapshot).unwrap();

    let scanned = open_collection(scanned_dir.path(), BootstrapPolicy::FailFast).unwrap();
    let loaded = open_collection(snapshot_dir.path(), BootstrapPolicy::FailFast).unwrap();

    assert!(!scanned.bootstrap().from_snapshot);
    assert!(loaded.bootstrap().from_snapshot);
    assert_eq!(sorted_keys(&scanned), sorted_keys(&loaded));
    assert_eq!(scanned.catalog(), loaded.catalog());
}

#[test]
fn test_scan_ignores_subcollection_records() {
    let temp_dir = TempDir::new().unwrap();
    {
        let root = open_collection(temp_dir.path(), BootstrapPolicy::FailFast).unwrap();
        let mut child = root.collection("child").unwrap();
        child.put("nested", b"1", false).unwrap();
    }
    fs::remove_file(temp_dir.path().join(CATALOG_FILENAME)).unwrap();

    let root = open_collection(temp_dir.path(), BootstrapPolicy::FailFast).unwrap();

    assert!(root.is_empty());
}

// =============================================================================
// Corrupt Record Tests
// =============================================================================

#[test]
fn test_corrupt_record_aborts_open_by_default() {
    let temp_dir = TempDir::new().unwrap();
    seed_records(temp_dir.path(), 3);
    fs::write(temp_dir.path().join("broken.rec"), b"\x00\x01garbage").unwrap();

    let err = open_collection(temp_dir.path(), BootstrapPolicy::FailFast).unwrap_err();

    assert!(matches!(err, CellarError::Decode(_)));
    assert!(!temp_dir.path().join(CATALOG_FILENAME).exists());
}

#[test]
fn test_corrupt_record_skipped_under_skip_policy() {
    let temp_dir = TempDir::new().unwrap();
    seed_records(temp_dir.path(), 3);
    fs::write(temp_dir.path().join("broken.rec"), b"\x00\x01garbage").unwrap();

    let collection = open_collection(temp_dir.path(), BootstrapPolicy::SkipCorrupt).unwrap();

    assert_eq!(collection.len(), 3);
    assert_eq!(collection.bootstrap().records_skipped, 1);
}

#[test]
fn test_corrupt_catalog_snapshot_is_decode_error() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(CATALOG_FILENAME), b"{ not json").unwrap();

    let err = open_collection(temp_dir.path(), BootstrapPolicy::SkipCorrupt).unwrap_err();

    assert!(matches!(err, CellarError::Decode(_)));
}

// =============================================================================
// Crash Simulation Tests
// =============================================================================

#[test]
fn test_interrupted_update_leaves_original_record_intact() {
    let temp_dir = TempDir::new().unwrap();
    let id;
    {
        let mut collection = open_collection(temp_dir.path(), BootstrapPolicy::FailFast).unwrap();
        collection.put("k", b"original", false).unwrap();
        id = collection.record_id("k").unwrap().to_string();
    }

    // An update that died before its rename: half a record in a temp file
    let update = encode_record(&Record::new(id.clone(), "k", b"updated".to_vec(), false)).unwrap();
    fs::write(
        temp_dir.path().join(".3f2a-interrupted.tmp"),
        &update[..update.len() / 2],
    )
    .unwrap();
    fs::remove_file(temp_dir.path().join(CATALOG_FILENAME)).unwrap();

    let mut collection = open_collection(temp_dir.path(), BootstrapPolicy::FailFast).unwrap();

    assert_eq!(collection.len(), 1);
    assert_eq!(collection.record_id("k"), Some(id.as_str()));
    assert_eq!(collection.get("k").unwrap(), b"original".to_vec());
}

#[test]
fn test_crash_between_record_and_catalog_write_leaves_orphan() {
    let temp_dir = TempDir::new().unwrap();
    {
        let mut collection = open_collection(temp_dir.path(), BootstrapPolicy::FailFast).unwrap();
        collection.put("indexed", b"1", false).unwrap();
    }

    // A put that wrote its record but never reached the catalog
    let mut store = open_store(temp_dir.path());
    let orphan = Record::new("orphan-id", "orphan", b"2".to_vec(), false);
    store.write(&store.make_record_location(&orphan.id), &orphan).unwrap();

    let mut collection = open_collection(temp_dir.path(), BootstrapPolicy::FailFast).unwrap();
    assert!(!collection.exists("orphan"));

    collection.reindex().unwrap();

    assert_eq!(sorted_keys(&collection), vec!["indexed", "orphan"]);
    assert_eq!(collection.get("orphan").unwrap(), b"2".to_vec());
}
