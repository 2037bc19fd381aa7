//! In-memory record store
//!
//! Volatile storage for tests and embedding. Every store handle derived from
//! the same root shares one map of namespaces, so sub-collections behave like
//! nested directories: truncating a parent drops its children too.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::catalog::Catalog;
use crate::error::{CellarError, Result};
use crate::record::Record;

use super::{validate_subcollection_name, RecordStore};

#[derive(Debug, Default)]
struct Namespace {
    records: HashMap<String, Record>,
    catalog: Option<Catalog>,
}

/// Namespace-scoped view over a shared in-memory map
#[derive(Debug, Clone)]
pub struct MemoryRecordStore {
    namespace: String,
    namespaces: Arc<RwLock<HashMap<String, Namespace>>>,
}

impl MemoryRecordStore {
    /// A fresh, empty root namespace
    pub fn new() -> Self {
        let mut namespaces = HashMap::new();
        namespaces.insert(String::new(), Namespace::default());

        Self {
            namespace: String::new(),
            namespaces: Arc::new(RwLock::new(namespaces)),
        }
    }

    /// Namespace path of this store ("" for the root)
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Number of records stored directly in this namespace
    pub fn record_count(&self) -> usize {
        self.namespaces
            .read()
            .get(&self.namespace)
            .map(|ns| ns.records.len())
            .unwrap_or(0)
    }

    fn is_nested_under(&self, other: &str) -> bool {
        self.namespace.is_empty() || other.starts_with(&format!("{}/", self.namespace))
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryRecordStore {
    /// The record id doubles as its location
    type Location = String;

    fn list(&self) -> Result<Vec<String>> {
        Ok(self
            .namespaces
            .read()
            .get(&self.namespace)
            .map(|ns| ns.records.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn read(&self, location: &String) -> Result<Record> {
        self.namespaces
            .read()
            .get(&self.namespace)
            .and_then(|ns| ns.records.get(location))
            .cloned()
            .ok_or_else(|| CellarError::RecordNotFound(format!("{}/{}", self.namespace, location)))
    }

    fn write(&mut self, location: &String, record: &Record) -> Result<()> {
        self.namespaces
            .write()
            .entry(self.namespace.clone())
            .or_default()
            .records
            .insert(location.clone(), record.clone());

        Ok(())
    }

    /// Removing a missing record is a no-op
    fn remove(&mut self, location: &String) -> Result<()> {
        if let Some(ns) = self.namespaces.write().get_mut(&self.namespace) {
            ns.records.remove(location);
        }

        Ok(())
    }

    fn make_record_location(&self, id: &str) -> String {
        id.to_string()
    }

    fn make_backend_for_subcollection(&self, name: &str) -> Result<Self> {
        let name = validate_subcollection_name(name)?.replace('\\', "/");
        let namespace = if self.namespace.is_empty() {
            name
        } else {
            format!("{}/{}", self.namespace, name)
        };

        self.namespaces.write().entry(namespace.clone()).or_default();

        Ok(Self {
            namespace,
            namespaces: Arc::clone(&self.namespaces),
        })
    }

    fn truncate(&mut self) -> Result<()> {
        let mut namespaces = self.namespaces.write();
        namespaces.retain(|name, _| !self.is_nested_under(name));
        namespaces.insert(self.namespace.clone(), Namespace::default());

        Ok(())
    }

    fn has_catalog(&self) -> Result<bool> {
        Ok(self
            .namespaces
            .read()
            .get(&self.namespace)
            .map(|ns| ns.catalog.is_some())
            .unwrap_or(false))
    }

    fn read_catalog(&self) -> Result<Catalog> {
        self.namespaces
            .read()
            .get(&self.namespace)
            .and_then(|ns| ns.catalog.clone())
            .ok_or_else(|| CellarError::RecordNotFound(format!("{}/catalog", self.namespace)))
    }

    fn write_catalog(&mut self, catalog: &Catalog) -> Result<()> {
        self.namespaces
            .write()
            .entry(self.namespace.clone())
            .or_default()
            .catalog = Some(catalog.clone());

        Ok(())
    }
}
