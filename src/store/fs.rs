//! Filesystem record store
//!
//! One file per record in a flat directory, plus a `catalog.json` snapshot.
//! Sub-collections are nested directories.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::catalog::{Catalog, CATALOG_FILENAME};
use crate::config::SyncStrategy;
use crate::error::{CellarError, Result};
use crate::record::{decode_record, encode_record, Record};

use super::{validate_subcollection_name, RecordStore};

/// Extension of every record file
pub const RECORD_EXTENSION: &str = "rec";

/// Directory-backed record store
///
/// ## Write discipline
/// - New record: created in place with `create_new`
/// - Existing record or catalog: written to `.<uuid>.tmp` in the same
///   directory, then renamed over the target, so a reader sees either the old
///   or the new bytes and never a mix
#[derive(Debug, Clone)]
pub struct FsRecordStore {
    /// Absolute directory of this collection
    dir: PathBuf,

    sync_strategy: SyncStrategy,
}

impl FsRecordStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl AsRef<Path>, sync_strategy: SyncStrategy) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let dir = fs::canonicalize(dir)?;

        Ok(Self { dir, sync_strategy })
    }

    /// Directory this store is rooted at
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn sync_strategy(&self) -> SyncStrategy {
        self.sync_strategy
    }

    fn catalog_path(&self) -> PathBuf {
        self.dir.join(CATALOG_FILENAME)
    }

    fn is_record_file(path: &Path) -> bool {
        let visible = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| !name.starts_with('.'))
            .unwrap_or(false);

        visible && path.extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXTENSION)
    }

    /// Create `path` with `bytes`; fails with `AlreadyExists` if it is there
    fn create_new(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(bytes)?;

        if self.sync_strategy == SyncStrategy::EveryWrite {
            file.sync_all()?;
            self.sync_dir()?;
        }

        Ok(())
    }

    /// Write to a temp file next to `path`, then rename it over `path`
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let temp_path = self.dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));

        let written = (|| -> io::Result<()> {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&temp_path)?;
            file.write_all(bytes)?;

            if self.sync_strategy == SyncStrategy::EveryWrite {
                file.sync_all()?;
            }

            Ok(())
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        if self.sync_strategy == SyncStrategy::EveryWrite {
            self.sync_dir()?;
        }

        Ok(())
    }

    /// Persist directory entries (new names, renames)
    #[cfg(unix)]
    fn sync_dir(&self) -> io::Result<()> {
        File::open(&self.dir)?.sync_all()
    }

    #[cfg(not(unix))]
    fn sync_dir(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Map a missing file to `RecordNotFound`, everything else to `Io`
fn not_found_as_record(path: &Path, e: io::Error) -> CellarError {
    if e.kind() == io::ErrorKind::NotFound {
        CellarError::RecordNotFound(path.display().to_string())
    } else {
        CellarError::Io(e)
    }
}

impl RecordStore for FsRecordStore {
    type Location = PathBuf;

    fn list(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();

            if entry.file_type()?.is_file() && Self::is_record_file(&path) {
                paths.push(path);
            }
        }

        Ok(paths)
    }

    fn read(&self, location: &PathBuf) -> Result<Record> {
        let bytes = fs::read(location).map_err(|e| not_found_as_record(location, e))?;

        decode_record(&bytes).map_err(|e| match e {
            CellarError::Decode(msg) => {
                CellarError::Decode(format!("{}: {}", location.display(), msg))
            }
            other => other,
        })
    }

    fn write(&mut self, location: &PathBuf, record: &Record) -> Result<()> {
        let bytes = encode_record(record)?;

        if !location.exists() {
            match self.create_new(location, &bytes) {
                Ok(()) => {
                    debug!(path = %location.display(), "created record file");
                    return Ok(());
                }
                // Appeared between the check and the create: overwrite atomically
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }
        }

        self.write_atomic(location, &bytes)?;
        debug!(path = %location.display(), "replaced record file");

        Ok(())
    }

    fn remove(&mut self, location: &PathBuf) -> Result<()> {
        fs::remove_file(location).map_err(|e| not_found_as_record(location, e))?;
        debug!(path = %location.display(), "removed record file");

        Ok(())
    }

    fn make_record_location(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", id, RECORD_EXTENSION))
    }

    fn make_backend_for_subcollection(&self, name: &str) -> Result<Self> {
        let name = validate_subcollection_name(name)?;

        Self::open(self.dir.join(name), self.sync_strategy)
    }

    fn truncate(&mut self) -> Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        // Keep the root so the collection stays usable after truncation
        fs::create_dir_all(&self.dir)?;
        debug!(dir = %self.dir.display(), "truncated record directory");

        Ok(())
    }

    fn has_catalog(&self) -> Result<bool> {
        Ok(self.catalog_path().is_file())
    }

    fn read_catalog(&self) -> Result<Catalog> {
        let path = self.catalog_path();
        let bytes = fs::read(&path).map_err(|e| not_found_as_record(&path, e))?;

        Catalog::from_json(&bytes)
    }

    fn write_catalog(&mut self, catalog: &Catalog) -> Result<()> {
        let bytes = catalog.to_json()?;

        self.write_atomic(&self.catalog_path(), &bytes)
    }
}
