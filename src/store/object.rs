//! Object storage record store
//!
//! One object per record keyed `<prefix>/<id>.rec`, with the catalog snapshot
//! at `<prefix>/catalog.json`. Sub-collections are nested prefixes.
//!
//! The store talks to the remote service through [`ObjectClient`], a small
//! synchronous seam. [`MemoryObjectClient`] backs tests; with the
//! `object-store` feature, `ObjectStoreClient` adapts any
//! `object_store::ObjectStore` implementation (S3, GCS, Azure, local).

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;

use crate::catalog::{Catalog, CATALOG_FILENAME};
use crate::error::{CellarError, Result};
use crate::record::{decode_record, encode_record, Record};

use super::{validate_subcollection_name, RecordStore, RECORD_EXTENSION};

/// Minimal blocking object storage API
///
/// Keys are `/`-delimited. Implementations rely on the service's native
/// atomicity: a `put` is visible either completely or not at all.
pub trait ObjectClient: Send + Sync {
    fn put(&self, key: &str, body: Bytes) -> Result<()>;

    /// Fails with `RecordNotFound` if the key does not exist
    fn get(&self, key: &str) -> Result<Bytes>;

    fn delete(&self, key: &str) -> Result<()>;

    fn exists(&self, key: &str) -> Result<bool>;

    /// Every key below `prefix` at any depth ("" lists the whole bucket)
    fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Record store over an [`ObjectClient`]
#[derive(Debug)]
pub struct ObjectRecordStore<C> {
    client: Arc<C>,

    /// Key prefix without leading or trailing `/` ("" for the bucket root)
    prefix: String,
}

impl<C> Clone for ObjectRecordStore<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            prefix: self.prefix.clone(),
        }
    }
}

impl<C: ObjectClient> ObjectRecordStore<C> {
    pub fn new(client: Arc<C>, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into().trim_matches('/').to_string();

        Self { client, prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Full object key for a name directly under this prefix
    fn object_key(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.prefix, name)
        }
    }

    fn catalog_key(&self) -> String {
        self.object_key(CATALOG_FILENAME)
    }

    /// Record keys are direct children named `*.rec`
    fn is_record_key(&self, key: &str) -> bool {
        let name = if self.prefix.is_empty() {
            key
        } else {
            match key
                .strip_prefix(self.prefix.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
            {
                Some(rest) => rest,
                None => return false,
            }
        };

        !name.contains('/') && name.ends_with(&format!(".{}", RECORD_EXTENSION))
    }
}

impl<C: ObjectClient> RecordStore for ObjectRecordStore<C> {
    type Location = String;

    fn list(&self) -> Result<Vec<String>> {
        Ok(self
            .client
            .list(&self.prefix)?
            .into_iter()
            .filter(|key| self.is_record_key(key))
            .collect())
    }

    fn read(&self, location: &String) -> Result<Record> {
        let body = self.client.get(location)?;

        decode_record(&body).map_err(|e| match e {
            CellarError::Decode(msg) => CellarError::Decode(format!("{}: {}", location, msg)),
            other => other,
        })
    }

    fn write(&mut self, location: &String, record: &Record) -> Result<()> {
        let bytes = encode_record(record)?;
        self.client.put(location, Bytes::from(bytes))?;
        debug!(key = %location, "put record object");

        Ok(())
    }

    fn remove(&mut self, location: &String) -> Result<()> {
        // Deleting a missing object succeeds on most services
        if !self.client.exists(location)? {
            return Err(CellarError::RecordNotFound(location.clone()));
        }

        self.client.delete(location)?;
        debug!(key = %location, "deleted record object");

        Ok(())
    }

    fn make_record_location(&self, id: &str) -> String {
        self.object_key(&format!("{}.{}", id, RECORD_EXTENSION))
    }

    /// Prefixes need no creation step
    fn make_backend_for_subcollection(&self, name: &str) -> Result<Self> {
        let name = validate_subcollection_name(name)?.replace('\\', "/");

        Ok(Self {
            client: Arc::clone(&self.client),
            prefix: self.object_key(&name),
        })
    }

    fn truncate(&mut self) -> Result<()> {
        let keys = self.client.list(&self.prefix)?;
        let count = keys.len();

        for key in keys {
            self.client.delete(&key)?;
        }

        debug!(prefix = %self.prefix, objects = count, "truncated object prefix");

        Ok(())
    }

    fn has_catalog(&self) -> Result<bool> {
        self.client.exists(&self.catalog_key())
    }

    fn read_catalog(&self) -> Result<Catalog> {
        let body = self.client.get(&self.catalog_key())?;

        Catalog::from_json(&body)
    }

    fn write_catalog(&mut self, catalog: &Catalog) -> Result<()> {
        let bytes = catalog.to_json()?;

        self.client.put(&self.catalog_key(), Bytes::from(bytes))
    }
}

// =============================================================================
// In-memory client
// =============================================================================

/// `BTreeMap`-backed [`ObjectClient`] for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryObjectClient {
    objects: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryObjectClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of objects in the bucket
    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    /// All object keys, sorted
    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }
}

impl ObjectClient for MemoryObjectClient {
    fn put(&self, key: &str, body: Bytes) -> Result<()> {
        self.objects.write().insert(key.to_string(), body);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Bytes> {
        self.objects
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| CellarError::RecordNotFound(key.to_string()))
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.objects.write().remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.read().contains_key(key))
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = prefix.trim_matches('/');
        let objects = self.objects.read();

        if prefix.is_empty() {
            return Ok(objects.keys().cloned().collect());
        }

        let dir = format!("{}/", prefix);
        Ok(objects
            .keys()
            .filter(|key| key.starts_with(&dir))
            .cloned()
            .collect())
    }
}

// =============================================================================
// object_store adapter
// =============================================================================

#[cfg(feature = "object-store")]
mod adapter {
    use std::sync::Arc;

    use bytes::Bytes;
    use futures::TryStreamExt;
    use object_store::path::Path;
    use object_store::{ObjectMeta, ObjectStore};

    use crate::error::{CellarError, Result};

    use super::ObjectClient;

    /// Drives an async `object_store` backend from blocking code
    ///
    /// Owns a current-thread tokio runtime, so it must not be called from
    /// inside another tokio runtime.
    pub struct ObjectStoreClient {
        store: Arc<dyn ObjectStore>,
        runtime: tokio::runtime::Runtime,
    }

    impl ObjectStoreClient {
        pub fn new(store: Arc<dyn ObjectStore>) -> Result<Self> {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;

            Ok(Self { store, runtime })
        }
    }

    impl std::fmt::Debug for ObjectStoreClient {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("ObjectStoreClient")
                .field("store", &self.store.to_string())
                .finish()
        }
    }

    fn map_err(key: &str, e: object_store::Error) -> CellarError {
        match e {
            object_store::Error::NotFound { .. } => CellarError::RecordNotFound(key.to_string()),
            other => CellarError::ObjectStore(other.to_string()),
        }
    }

    impl ObjectClient for ObjectStoreClient {
        fn put(&self, key: &str, body: Bytes) -> Result<()> {
            let path = Path::from(key);
            self.runtime
                .block_on(self.store.put(&path, body.into()))
                .map_err(|e| map_err(key, e))?;

            Ok(())
        }

        fn get(&self, key: &str) -> Result<Bytes> {
            let path = Path::from(key);
            self.runtime
                .block_on(async { self.store.get(&path).await?.bytes().await })
                .map_err(|e| map_err(key, e))
        }

        fn delete(&self, key: &str) -> Result<()> {
            let path = Path::from(key);
            self.runtime
                .block_on(self.store.delete(&path))
                .map_err(|e| map_err(key, e))
        }

        fn exists(&self, key: &str) -> Result<bool> {
            let path = Path::from(key);
            match self.runtime.block_on(self.store.head(&path)) {
                Ok(_) => Ok(true),
                Err(object_store::Error::NotFound { .. }) => Ok(false),
                Err(e) => Err(CellarError::ObjectStore(e.to_string())),
            }
        }

        fn list(&self, prefix: &str) -> Result<Vec<String>> {
            let prefix = prefix.trim_matches('/');
            let prefix_path = (!prefix.is_empty()).then(|| Path::from(prefix));

            let objects: Vec<ObjectMeta> = self
                .runtime
                .block_on(self.store.list(prefix_path.as_ref()).try_collect())
                .map_err(|e| map_err(prefix, e))?;

            Ok(objects
                .into_iter()
                .map(|meta| meta.location.to_string())
                .collect())
        }
    }
}

#[cfg(feature = "object-store")]
pub use adapter::ObjectStoreClient;
