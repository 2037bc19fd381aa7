//! Catalog bootstrap
//!
//! Loads the catalog snapshot, or rebuilds it by scanning every record when
//! no snapshot exists yet.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::config::BootstrapPolicy;
use crate::error::{CellarError, Result};
use crate::record::Record;
use crate::store::RecordStore;

use super::{Catalog, CatalogEntry};

/// Outcome of loading a collection's catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bootstrap {
    /// The catalog came from an existing snapshot (no record was read)
    pub from_snapshot: bool,

    /// Number of records indexed by the scan
    pub records_indexed: usize,

    /// Number of undecodable records left out (only under `SkipCorrupt`)
    pub records_skipped: usize,

    /// Records whose key was already indexed by another record
    pub duplicate_keys: usize,
}

impl Bootstrap {
    /// Load the snapshot if there is one, otherwise scan and persist
    ///
    /// Returns the catalog, the values of every cacheable record read during
    /// a scan (empty on the snapshot path), and stats.
    pub fn load<S: RecordStore>(
        store: &mut S,
        policy: BootstrapPolicy,
    ) -> Result<(Catalog, HashMap<String, Vec<u8>>, Bootstrap)> {
        if store.has_catalog()? {
            let catalog = store.read_catalog()?;
            info!(entries = catalog.len(), "loaded catalog snapshot");

            let stats = Bootstrap {
                from_snapshot: true,
                ..Bootstrap::default()
            };
            return Ok((catalog, HashMap::new(), stats));
        }

        Self::rebuild(store, policy, None)
    }

    /// Scan every record, build a fresh catalog, and persist it
    ///
    /// 1. List all record locations
    /// 2. Read each record; decode failures abort or are skipped per `policy`
    /// 3. Index key → {id, cacheable}, collecting cacheable values
    /// 4. Write the catalog snapshot so the next open takes the fast path
    ///
    /// When several records claim one key, the record `previous` maps that
    /// key to wins; otherwise the smallest record id wins, independent of
    /// listing order. The losers stay on the backend as orphans.
    pub fn rebuild<S: RecordStore>(
        store: &mut S,
        policy: BootstrapPolicy,
        previous: Option<&Catalog>,
    ) -> Result<(Catalog, HashMap<String, Vec<u8>>, Bootstrap)> {
        let locations = store.list()?;
        info!(records = locations.len(), "no catalog snapshot, scanning records");

        let mut catalog = Catalog::new();
        let mut cache = HashMap::new();
        let mut stats = Bootstrap::default();

        for location in &locations {
            let record = match store.read(location) {
                Ok(record) => record,
                Err(CellarError::Decode(msg)) if policy == BootstrapPolicy::SkipCorrupt => {
                    warn!(location = ?location, error = %msg, "skipping undecodable record");
                    stats.records_skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let replaces = match catalog.get(&record.key) {
                Some(existing) => {
                    let keep_new = prefers(previous, &record, &existing.file_id);
                    let (kept, orphan) = if keep_new {
                        (record.id.as_str(), existing.file_id.as_str())
                    } else {
                        (existing.file_id.as_str(), record.id.as_str())
                    };
                    warn!(key = %record.key, %kept, %orphan, "duplicate key during scan");
                    stats.duplicate_keys += 1;
                    if !keep_new {
                        continue;
                    }
                    true
                }
                None => false,
            };

            if record.cacheable {
                cache.insert(record.key.clone(), record.value);
            } else if replaces {
                cache.remove(&record.key);
            }

            catalog.upsert(CatalogEntry {
                key: record.key,
                file_id: record.id,
                cacheable: record.cacheable,
            });
            if !replaces {
                stats.records_indexed += 1;
            }
        }

        store.write_catalog(&catalog)?;

        info!(
            indexed = stats.records_indexed,
            skipped = stats.records_skipped,
            duplicates = stats.duplicate_keys,
            "catalog rebuilt from scan"
        );

        Ok((catalog, cache, stats))
    }
}

/// Whether `candidate` should replace the record `current_id` already indexed
/// under the same key
fn prefers(previous: Option<&Catalog>, candidate: &Record, current_id: &str) -> bool {
    match previous.and_then(|catalog| catalog.get(&candidate.key)) {
        Some(entry) if entry.file_id == current_id => false,
        Some(entry) if entry.file_id == candidate.id => true,
        _ => candidate.id.as_str() < current_id,
    }
}
