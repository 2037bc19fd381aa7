//! # Cellar
//!
//! An embeddable key-value store that persists every key as its own record:
//! - One record per key under a pluggable backend (filesystem, object storage, memory)
//! - In-memory catalog for O(1) key → record resolution
//! - Catalog snapshot per location, rebuilt by scanning when missing
//! - Optional per-key value cache
//! - Nested sub-collections
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Collection                            │
//! │              (put / get / delete / keys / ...)               │
//! └───────────┬──────────────────────┬──────────────────────────┘
//!             │                      │
//!             ▼                      ▼
//!      ┌─────────────┐        ┌─────────────┐
//!      │   Catalog   │        │    Cache    │
//!      │ key → id    │        │ key → value │
//!      └──────┬──────┘        └─────────────┘
//!             │
//!             ▼
//!  ┌──────────────────────────────────────────┐
//!  │               RecordStore                 │
//!  │   Fs  │  Object (S3, ...)  │  Memory      │
//!  └──────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use cellar::Collection;
//!
//! # fn main() -> cellar::Result<()> {
//! let mut users = Collection::open_dir("./data/users")?;
//! users.put("alice", b"{\"age\": 31}", true)?;
//! assert_eq!(users.get("alice")?, b"{\"age\": 31}".to_vec());
//!
//! let mut admins = users.collection("admins")?;
//! admins.put("root", b"1", false)?;
//! assert!(!users.exists("root"));
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod id;
pub mod record;
pub mod catalog;
pub mod store;
pub mod collection;
pub mod shared;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CellarError, Result};
pub use config::{BootstrapPolicy, Config, SyncStrategy};
pub use id::IdGenerator;
pub use record::Record;
pub use catalog::{Bootstrap, Catalog, CatalogEntry};
pub use store::{
    FsRecordStore, MemoryObjectClient, MemoryRecordStore, ObjectClient, ObjectRecordStore,
    RecordStore,
};
pub use collection::Collection;
pub use shared::SharedCollection;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Cellar
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
