//! Collection Module
//!
//! The public key-value façade over a record store and its catalog.
//!
//! ## Responsibilities
//! - Resolve keys through the in-memory catalog (no backend listing)
//! - Delegate physical I/O to the store, then persist the catalog snapshot
//! - Mirror cacheable values in memory
//! - Expose nested sub-collections
//!
//! ## Ordering Guarantees
//! - `put`: record write → catalog update → snapshot write. A crash in between
//!   leaves an orphan record, which the next scan reclaims.
//! - `delete`: record removal → catalog update → snapshot write. A crash in
//!   between leaves a dangling entry, reported as `Corruption` on access and
//!   dropped by `reindex`.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::catalog::{Bootstrap, Catalog, CatalogEntry};
use crate::config::{BootstrapPolicy, Config};
use crate::error::{CellarError, Result};
use crate::id::IdGenerator;
use crate::record::Record;
use crate::store::{FsRecordStore, RecordStore};

/// A key-value namespace backed by one store location
///
/// ## Concurrency Model
///
/// All operations are synchronous and run on the caller's thread. A collection
/// assumes a single writer: mutating methods take `&mut self`, so sharing one
/// instance across threads requires external synchronization
/// (see [`SharedCollection`](crate::SharedCollection)).
pub struct Collection<S: RecordStore> {
    /// Physical storage for this namespace
    store: S,

    /// key → {file id, cacheable}
    catalog: Catalog,

    /// key → value for cacheable entries
    cache: HashMap<String, Vec<u8>>,

    /// Source of ids for newly inserted keys
    ids: IdGenerator,

    /// Passed on to sub-collections and `reindex`
    bootstrap_policy: BootstrapPolicy,

    /// How the catalog was obtained at open/reindex time
    bootstrap: Bootstrap,
}

impl Collection<FsRecordStore> {
    /// Open a filesystem collection with the given config
    pub fn open_fs(config: Config) -> Result<Self> {
        config.validate()?;
        let store = FsRecordStore::open(&config.data_dir, config.sync_strategy)?;

        Self::with_options(store, IdGenerator::default(), config.bootstrap_policy)
    }

    /// Open a filesystem collection at `path` (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_dir(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::builder().data_dir(path.as_ref()).build();
        Self::open_fs(config)
    }
}

impl<S: RecordStore> Collection<S> {
    /// Open a collection over `store` with random ids and fail-fast bootstrap
    pub fn open(store: S) -> Result<Self> {
        Self::with_options(store, IdGenerator::default(), BootstrapPolicy::FailFast)
    }

    /// Open a collection with an explicit id generator and bootstrap policy
    ///
    /// Loads the catalog snapshot when present; otherwise scans every record
    /// and writes a fresh snapshot.
    pub fn with_options(
        mut store: S,
        ids: IdGenerator,
        bootstrap_policy: BootstrapPolicy,
    ) -> Result<Self> {
        let (catalog, cache, bootstrap) = Bootstrap::load(&mut store, bootstrap_policy)?;

        Ok(Self {
            store,
            catalog,
            cache,
            ids,
            bootstrap_policy,
            bootstrap,
        })
    }

    /// Insert or update `key`
    ///
    /// Steps:
    /// 1. Validate key and value
    /// 2. Reuse the key's record id, or generate one for a new key
    /// 3. Write the record
    /// 4. Refresh or evict the cached value
    /// 5. Upsert the catalog entry and persist the snapshot
    pub fn put(&mut self, key: &str, value: &[u8], cacheable: bool) -> Result<()> {
        if key.trim().is_empty() {
            return Err(CellarError::Validation("Key cannot be blank".to_string()));
        }
        if value.is_empty() {
            return Err(CellarError::Validation(format!(
                "Value for key {:?} cannot be empty",
                key
            )));
        }

        let id = match self.catalog.get(key) {
            Some(entry) => entry.file_id.clone(),
            None => self.ids.next_id(),
        };

        let record = Record::new(id, key, value.to_vec(), cacheable);
        let location = self.store.make_record_location(&record.id);

        // Step 3: Record first, so the index never points at missing data
        self.store.write(&location, &record)?;

        // Step 4: Cache must match the record now on the store, even if the
        // snapshot write below fails
        if cacheable {
            self.cache.insert(key.to_string(), record.value);
        } else {
            self.cache.remove(key);
        }

        // Step 5: Index
        self.catalog.upsert(CatalogEntry {
            key: record.key,
            file_id: record.id.clone(),
            cacheable,
        });
        self.store.write_catalog(&self.catalog)?;

        debug!(key = %key, id = %record.id, cacheable, "put");

        Ok(())
    }

    /// Get the value stored under `key`
    ///
    /// Search order:
    /// 1. Cache
    /// 2. Catalog → record store
    pub fn get(&mut self, key: &str) -> Result<Vec<u8>> {
        if let Some(value) = self.cache.get(key) {
            return Ok(value.clone());
        }

        let entry = self
            .catalog
            .get(key)
            .ok_or_else(|| CellarError::KeyNotFound(key.to_string()))?;

        let record = self.read_entry(entry)?;

        // Snapshot-loaded catalogs start cold; warm on first read
        if entry.cacheable {
            self.cache.insert(key.to_string(), record.value.clone());
        }

        Ok(record.value)
    }

    /// Delete `key`
    ///
    /// Steps:
    /// 1. Resolve the key's record (KeyNotFound if unknown)
    /// 2. Remove the record
    /// 3. Remove the catalog entry and persist the snapshot
    pub fn delete(&mut self, key: &str) -> Result<()> {
        let entry = self
            .catalog
            .get(key)
            .ok_or_else(|| CellarError::KeyNotFound(key.to_string()))?;

        let location = self.store.make_record_location(&entry.file_id);
        match self.store.remove(&location) {
            Ok(()) => {}
            Err(CellarError::RecordNotFound(_)) => {
                return Err(CellarError::Corruption {
                    key: key.to_string(),
                    id: entry.file_id.clone(),
                });
            }
            Err(e) => return Err(e),
        }

        self.catalog.remove(key);
        self.cache.remove(key);
        self.store.write_catalog(&self.catalog)?;

        debug!(key = %key, "deleted");

        Ok(())
    }

    /// Catalog membership, no I/O
    pub fn exists(&self, key: &str) -> bool {
        self.catalog.contains(key)
    }

    /// All keys, in no particular order
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.catalog.keys()
    }

    /// Keys whose values are currently held in the cache
    pub fn cached_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.cache.keys().map(String::as_str)
    }

    /// Lazily read every key's value, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Result<Vec<u8>>)> + '_ {
        self.catalog.entries().map(move |entry| {
            let value = match self.cache.get(&entry.key) {
                Some(value) => Ok(value.clone()),
                None => self.read_entry(entry).map(|record| record.value),
            };
            (entry.key.as_str(), value)
        })
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    /// Drop every key, the cache, and all data under this store location
    pub fn truncate(&mut self) -> Result<()> {
        self.catalog.clear();
        self.cache.clear();
        self.store.truncate()?;

        debug!("truncated collection");

        Ok(())
    }

    /// Discard the in-memory state and rebuild the catalog by scanning records
    ///
    /// Heals divergence left by an interrupted put or delete. A key claimed by
    /// several records keeps the record the current catalog points at.
    pub fn reindex(&mut self) -> Result<&Bootstrap> {
        let (catalog, cache, bootstrap) =
            Bootstrap::rebuild(&mut self.store, self.bootstrap_policy, Some(&self.catalog))?;

        self.catalog = catalog;
        self.cache = cache;
        self.bootstrap = bootstrap;

        Ok(&self.bootstrap)
    }

    /// Open the sub-collection `name` (independent catalog and cache)
    pub fn collection(&self, name: &str) -> Result<Collection<S>> {
        let store = self.store.make_backend_for_subcollection(name)?;

        Collection::with_options(store, self.ids.clone(), self.bootstrap_policy)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// The underlying record store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The in-memory catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// How the catalog was obtained
    pub fn bootstrap(&self) -> &Bootstrap {
        &self.bootstrap
    }

    /// The record id currently assigned to `key`
    pub fn record_id(&self, key: &str) -> Option<&str> {
        self.catalog.get(key).map(|entry| entry.file_id.as_str())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Read the record behind a catalog entry; a missing record is corruption
    fn read_entry(&self, entry: &CatalogEntry) -> Result<Record> {
        let location = self.store.make_record_location(&entry.file_id);

        match self.store.read(&location) {
            Ok(record) => Ok(record),
            Err(CellarError::RecordNotFound(_)) => Err(CellarError::Corruption {
                key: entry.key.clone(),
                id: entry.file_id.clone(),
            }),
            Err(e) => Err(e),
        }
    }
}

impl<S: RecordStore + std::fmt::Debug> std::fmt::Debug for Collection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("store", &self.store)
            .field("keys", &self.catalog.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}
