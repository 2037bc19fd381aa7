//! Tests for collections over object storage
//!
//! These tests verify:
//! - Object layout (`<prefix>/<id>.rec`, `<prefix>/catalog.json`)
//! - Put/get/delete through the object client
//! - Bootstrap from objects written without a catalog

use std::sync::Arc;

use bytes::Bytes;
use cellar::{
    BootstrapPolicy, CellarError, Collection, IdGenerator, MemoryObjectClient, ObjectClient,
    ObjectRecordStore, Record, RecordStore,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_collection(
    prefix: &str,
) -> (Arc<MemoryObjectClient>, Collection<ObjectRecordStore<MemoryObjectClient>>) {
    let client = Arc::new(MemoryObjectClient::new());
    let store = ObjectRecordStore::new(Arc::clone(&client), prefix);
    let collection =
        Collection::with_options(store, IdGenerator::sequential("r"), BootstrapPolicy::FailFast)
            .unwrap();
    (client, collection)
}

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_objects_use_prefix_layout() {
    let (client, mut collection) = setup_collection("kv");

    collection.put("a", b"1", false).unwrap();

    assert_eq!(
        client.keys(),
        vec!["kv/catalog.json".to_string(), "kv/r000001.rec".to_string()]
    );
}

#[test]
fn test_update_overwrites_single_object() {
    let (client, mut collection) = setup_collection("kv");

    collection.put("a", b"1", false).unwrap();
    collection.put("a", b"2", true).unwrap();

    assert_eq!(client.object_count(), 2);
    assert_eq!(collection.get("a").unwrap(), b"2".to_vec());
}

// =============================================================================
// Operation Tests
// =============================================================================

#[test]
fn test_put_get_delete() {
    let (client, mut collection) = setup_collection("kv");

    collection.put("k", b"hello", false).unwrap();
    assert_eq!(collection.get("k").unwrap(), b"hello".to_vec());

    collection.delete("k").unwrap();

    assert!(!collection.exists("k"));
    assert!(matches!(collection.get("k"), Err(CellarError::KeyNotFound(_))));
    assert_eq!(client.keys(), vec!["kv/catalog.json".to_string()]);
}

#[test]
fn test_deleted_object_surfaces_as_corruption() {
    let (client, mut collection) = setup_collection("kv");
    collection.put("k", b"hello", false).unwrap();

    client.delete("kv/r000001.rec").unwrap();

    assert!(matches!(collection.get("k"), Err(CellarError::Corruption { .. })));
    assert!(matches!(collection.delete("k"), Err(CellarError::Corruption { .. })));
}

// =============================================================================
// Bootstrap Tests
// =============================================================================

#[test]
fn test_bootstrap_from_objects_without_catalog() {
    let client = Arc::new(MemoryObjectClient::new());
    let mut store = ObjectRecordStore::new(Arc::clone(&client), "legacy");
    for i in 0..4 {
        let record =
            Record::new(format!("id{}", i), format!("key{}", i), vec![i as u8 + 1], i == 0);
        let location = store.make_record_location(&record.id);
        store.write(&location, &record).unwrap();
    }
    client.put("legacy/README", Bytes::from_static(b"not a record")).unwrap();

    let mut collection = Collection::open(store).unwrap();

    assert_eq!(collection.len(), 4);
    assert_eq!(collection.bootstrap().records_indexed, 4);
    assert_eq!(collection.cached_keys().collect::<Vec<_>>(), vec!["key0"]);
    assert_eq!(collection.get("key3").unwrap(), vec![4]);
    assert!(client.exists("legacy/catalog.json").unwrap());
}

#[test]
fn test_reopen_uses_catalog_object() {
    let client = Arc::new(MemoryObjectClient::new());
    {
        let store = ObjectRecordStore::new(Arc::clone(&client), "kv");
        let mut collection = Collection::open(store).unwrap();
        collection.put("k", b"v", false).unwrap();
    }

    let store = ObjectRecordStore::new(Arc::clone(&client), "kv");
    let mut collection = Collection::open(store).unwrap();

    assert!(collection.bootstrap().from_snapshot);
    assert_eq!(collection.get("k").unwrap(), b"v".to_vec());
}
