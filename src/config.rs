//! Configuration for Cellar
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{CellarError, Result};

/// Configuration for a filesystem-backed collection
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory of the collection
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── <id>.rec         (one file per record)
    ///     ├── catalog.json     (index snapshot)
    ///     └── <name>/          (sub-collections)
    pub data_dir: PathBuf,

    /// Whether record and catalog writes are fsynced
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Catalog Configuration
    // -------------------------------------------------------------------------
    /// What to do with unreadable records during a bootstrap scan
    pub bootstrap_policy: BootstrapPolicy,
}

/// Durability of filesystem writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync the temp file before renaming it into place (safest, slowest)
    EveryWrite,

    /// Leave flushing to the operating system's page cache
    OsBuffered,
}

/// Handling of records that fail to decode while rebuilding the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapPolicy {
    /// Abort collection construction with the decode error
    FailFast,

    /// Log a warning and leave the record out of the catalog
    SkipCorrupt,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./cellar_data"),
            sync_strategy: SyncStrategy::EveryWrite,
            bootstrap_policy: BootstrapPolicy::FailFast,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the settings before anything touches the disk
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(CellarError::Config("data_dir cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root of the collection)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the sync strategy for record and catalog writes
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the bootstrap policy for corrupt records
    pub fn bootstrap_policy(mut self, policy: BootstrapPolicy) -> Self {
        self.config.bootstrap_policy = policy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
