//! Configuration for AssortDB
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::table::TableOptions;

/// Configuration for one assortment store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory shared by all assortment files
    /// Internal structure:
    ///   {storage_root}/
    ///     ├── assortment_001.db    (one file per capacity)
    ///     ├── assortment_002.db
    ///     └── backup/              (files moved aside by recovery)
    pub storage_root: PathBuf,

    /// Number of document references per record (N)
    pub capacity: usize,

    // -------------------------------------------------------------------------
    // Table Configuration
    // -------------------------------------------------------------------------
    /// Row cache size in bytes (0 disables caching)
    pub buffer_size: usize,

    /// Time allowed for warming the row cache while a table is opened
    pub preload_budget: Duration,

    /// Sync strategy: how often to fsync the table file
    pub sync_strategy: SyncStrategy,
}

/// Table sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced writes (balanced durability/performance)
    EveryNWrites { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("./assortdb_data"),
            capacity: 1,
            buffer_size: 4 * 1024 * 1024, // 4 MB
            preload_budget: Duration::from_millis(500),
            sync_strategy: SyncStrategy::EveryNWrites { count: 100 },
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Options handed to the backing table
    pub fn table_options(&self) -> TableOptions {
        TableOptions {
            cache_bytes: self.buffer_size,
            preload_budget: self.preload_budget,
            sync_strategy: self.sync_strategy,
        }
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the storage root directory
    pub fn storage_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.storage_root = path.into();
        self
    }

    /// Set the assortment capacity (references per record)
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Set the row cache size (in bytes)
    pub fn buffer_size(mut self, bytes: usize) -> Self {
        self.config.buffer_size = bytes;
        self
    }

    /// Set the row cache size (in kilobytes)
    pub fn buffer_kb(mut self, kb: usize) -> Self {
        self.config.buffer_size = kb * 1024;
        self
    }

    /// Set the preload budget
    pub fn preload_budget(mut self, budget: Duration) -> Self {
        self.config.preload_budget = budget;
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
