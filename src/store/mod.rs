//! Store Module
//!
//! Pluggable physical storage for records and catalog snapshots.
//!
//! ## Responsibilities
//! - Enumerate, read, write and remove records by location
//! - Map record ids to locations
//! - Derive nested backends for sub-collections
//! - Persist the catalog snapshot next to the records
//!
//! ## Implementations
//! - [`FsRecordStore`]: one file per record in a directory, atomic renames
//! - [`MemoryRecordStore`]: volatile namespaces, for tests and embedding
//! - [`ObjectRecordStore`]: one object per record under a key prefix

mod fs;
mod memory;
mod object;

pub use fs::{FsRecordStore, RECORD_EXTENSION};
pub use memory::MemoryRecordStore;
pub use object::{MemoryObjectClient, ObjectClient, ObjectRecordStore};

#[cfg(feature = "object-store")]
pub use object::ObjectStoreClient;

use std::fmt::Debug;

use crate::catalog::Catalog;
use crate::error::{CellarError, Result};
use crate::record::Record;

/// Capability set a storage medium implements to back a collection
///
/// A store is rooted at one location (a directory, an object prefix, an
/// in-memory namespace). Everything it lists, truncates or snapshots lives
/// under that root.
pub trait RecordStore: Sized {
    /// Physical address of a single record
    type Location: Clone + Debug;

    /// All record locations under this root, excluding the catalog snapshot
    /// and anything belonging to sub-collections
    fn list(&self) -> Result<Vec<Self::Location>>;

    /// Read and decode the record at `location`
    ///
    /// Fails with `RecordNotFound` if nothing is stored there and `Decode`
    /// if the stored bytes are not a record.
    fn read(&self, location: &Self::Location) -> Result<Record>;

    /// Upsert `record` at `location`. Readers never observe a partial write.
    fn write(&mut self, location: &Self::Location, record: &Record) -> Result<()>;

    /// Delete the record at `location`
    fn remove(&mut self, location: &Self::Location) -> Result<()>;

    /// Deterministic id → location mapping
    fn make_record_location(&self, id: &str) -> Self::Location;

    /// A new store rooted at the child namespace `name`, created if needed
    fn make_backend_for_subcollection(&self, name: &str) -> Result<Self>;

    /// Irreversibly delete every record and the catalog snapshot
    fn truncate(&mut self) -> Result<()>;

    fn has_catalog(&self) -> Result<bool>;

    fn read_catalog(&self) -> Result<Catalog>;

    /// Replace the catalog snapshot as a whole
    fn write_catalog(&mut self, catalog: &Catalog) -> Result<()>;
}

/// Sub-collection names are relative paths without `..` segments.
/// Returns the name with surrounding whitespace removed.
pub(crate) fn validate_subcollection_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CellarError::Validation(
            "Sub-collection name cannot be blank".to_string(),
        ));
    }

    if trimmed.starts_with('/') || trimmed.starts_with('\\') {
        return Err(CellarError::Validation(format!(
            "Sub-collection name must be relative: {:?}",
            name
        )));
    }

    if trimmed
        .split(['/', '\\'])
        .any(|segment| segment == ".." || segment == "." || segment.is_empty())
    {
        return Err(CellarError::Validation(format!(
            "Sub-collection name has an invalid segment: {:?}",
            name
        )));
    }

    // A segment named like the snapshot collides with that directory's catalog
    if trimmed
        .split(['/', '\\'])
        .any(|segment| segment == crate::catalog::CATALOG_FILENAME)
    {
        return Err(CellarError::Validation(format!(
            "Sub-collection name {:?} uses the reserved segment {:?}",
            name,
            crate::catalog::CATALOG_FILENAME
        )));
    }

    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_nested_relative_names() {
        assert_eq!(validate_subcollection_name("users").unwrap(), "users");
        assert_eq!(validate_subcollection_name(" tenants/acme ").unwrap(), "tenants/acme");
    }

    #[test]
    fn test_rejects_blank_absolute_and_parent_names() {
        let names = [
            "",
            "   ",
            "/etc",
            "../escape",
            "a/../b",
            "a//b",
            "catalog.json",
            "a/catalog.json",
            "catalog.json/b",
        ];
        for name in names {
            let err = validate_subcollection_name(name).unwrap_err();
            assert!(matches!(err, CellarError::Validation(_)), "{:?}", name);
        }
    }
}
