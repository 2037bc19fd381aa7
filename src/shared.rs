//! Shared collection handle
//!
//! [`Collection`] itself has no internal locking. Hosts that need to reach one
//! collection from several threads wrap it here: every call takes a single
//! exclusive lock, so operations never interleave.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::collection::Collection;
use crate::error::Result;
use crate::store::RecordStore;

/// Cloneable, thread-safe handle to one collection
pub struct SharedCollection<S: RecordStore> {
    inner: Arc<Mutex<Collection<S>>>,
}

impl<S: RecordStore> Clone for SharedCollection<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: RecordStore> SharedCollection<S> {
    pub fn new(collection: Collection<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(collection)),
        }
    }

    pub fn put(&self, key: &str, value: &[u8], cacheable: bool) -> Result<()> {
        self.inner.lock().put(key, value, cacheable)
    }

    pub fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.inner.lock().get(key)
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        self.inner.lock().delete(key)
    }

    pub fn exists(&self, key: &str) -> bool {
        self.inner.lock().exists(key)
    }

    /// Keys at the time of the call
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().keys().map(str::to_string).collect()
    }

    pub fn cached_keys(&self) -> Vec<String> {
        self.inner.lock().cached_keys().map(str::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn truncate(&self) -> Result<()> {
        self.inner.lock().truncate()
    }

    /// Open a sub-collection behind its own lock
    pub fn collection(&self, name: &str) -> Result<SharedCollection<S>> {
        let child = self.inner.lock().collection(name)?;
        Ok(SharedCollection::new(child))
    }

    /// Run several operations under one lock acquisition
    pub fn with_lock<T>(&self, f: impl FnOnce(&mut Collection<S>) -> T) -> T {
        f(&mut self.inner.lock())
    }
}
