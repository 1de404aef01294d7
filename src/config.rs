//! Configuration for cdvault
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for a cdvault store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the table files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── cdc_data.dir / cdc_data.pag   (catalog table)
    ///     └── cdt_data.dir / cdt_data.pag   (track table)
    pub data_dir: PathBuf,

    /// Number of hash buckets for newly created tables.
    /// Existing tables keep the bucket count stored in their header.
    pub bucket_count: u32,

    /// Unix permission bits for newly created table files
    pub file_mode: u32,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// When to fsync table files
    pub sync_strategy: SyncStrategy,
}

/// Table sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every put/delete (safest, slowest)
    EveryWrite,

    /// fsync only when the store is closed or re-initialized
    OnClose,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            bucket_count: 256,
            file_mode: 0o644,
            sync_strategy: SyncStrategy::OnClose,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the bucket count used when creating tables (clamped to at least 1)
    pub fn bucket_count(mut self, count: u32) -> Self {
        self.config.bucket_count = count.max(1);
        self
    }

    /// Set the permission bits for created files
    pub fn file_mode(mut self, mode: u32) -> Self {
        self.config.file_mode = mode;
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
