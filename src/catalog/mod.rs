//! Catalog Module
//!
//! The index mapping logical keys to physical record ids.
//!
//! ## Responsibilities
//! - Resolve key → {file id, cacheable} without touching the backend
//! - Serialize as a single JSON snapshot per backend location
//! - Rebuild itself by scanning every record when no snapshot exists
//!
//! ## Snapshot Format
//! ```text
//! {
//!   "entries": {
//!     "<key>": { "key": "<key>", "fileID": "<id>", "cacheable": false }
//!   }
//! }
//! ```

mod bootstrap;

pub use bootstrap::Bootstrap;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CellarError, Result};

/// Reserved name of the snapshot file/object in every backend location
pub const CATALOG_FILENAME: &str = "catalog.json";

/// One catalog entry per live key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub key: String,

    /// Id of the record holding this key's value
    #[serde(rename = "fileID")]
    pub file_id: String,

    pub cacheable: bool,
}

/// In-memory index of a collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    entries: HashMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace the entry for `entry.key`
    pub fn upsert(&mut self, entry: CatalogEntry) {
        self.entries.insert(entry.key.clone(), entry);
    }

    pub fn remove(&mut self, key: &str) -> Option<CatalogEntry> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Keys in no particular order
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> + '_ {
        self.entries.values()
    }

    /// Serialize as a pretty-printed JSON document
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| CellarError::Decode(format!("Failed to encode catalog: {}", e)))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let catalog: Catalog = serde_json::from_slice(bytes)
            .map_err(|e| CellarError::Decode(format!("Invalid catalog snapshot: {}", e)))?;

        if let Some((map_key, entry)) = catalog.entries.iter().find(|(k, e)| **k != e.key) {
            return Err(CellarError::Decode(format!(
                "Catalog entry {:?} is stored under mismatched key {:?}",
                entry.key, map_key
            )));
        }

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, id: &str, cacheable: bool) -> CatalogEntry {
        CatalogEntry {
            key: key.to_string(),
            file_id: id.to_string(),
            cacheable,
        }
    }

    #[test]
    fn test_upsert_replaces_existing_entry() {
        let mut catalog = Catalog::new();
        catalog.upsert(entry("a", "1", false));
        catalog.upsert(entry("a", "1", true));

        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("a").unwrap().cacheable);
    }

    #[test]
    fn test_remove_returns_entry() {
        let mut catalog = Catalog::new();
        catalog.upsert(entry("a", "1", false));

        assert_eq!(catalog.remove("a"), Some(entry("a", "1", false)));
        assert!(catalog.remove("a").is_none());
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_json_uses_file_id_field_name() {
        let mut catalog = Catalog::new();
        catalog.upsert(entry("user:1", "abc", true));

        let json = String::from_utf8(catalog.to_json().unwrap()).unwrap();
        assert!(json.contains("\"fileID\": \"abc\""));
        assert!(json.contains("\"entries\""));

        assert_eq!(Catalog::from_json(json.as_bytes()).unwrap(), catalog);
    }

    #[test]
    fn test_from_json_reads_hand_written_snapshot() {
        let json = br#"{"entries":{"k":{"key":"k","fileID":"f1","cacheable":false}}}"#;
        let catalog = Catalog::from_json(json).unwrap();

        assert_eq!(catalog.get("k").unwrap().file_id, "f1");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            Catalog::from_json(b"not json"),
            Err(CellarError::Decode(_))
        ));
    }

    #[test]
    fn test_from_json_rejects_mismatched_key() {
        let json = br#"{"entries":{"k":{"key":"other","fileID":"f1","cacheable":false}}}"#;

        assert!(matches!(
            Catalog::from_json(json),
            Err(CellarError::Decode(_))
        ));
    }
}
