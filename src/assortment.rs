//! Assortment Store
//!
//! One shard of the word index cache: every term whose reference count is
//! exactly N, stored as fixed-width rows in a single table file.
//!
//! ## Responsibilities
//! - Open the table for N, or create it fresh
//! - Convert containers to rows and back through the [`RowLayout`]
//! - Refuse to overwrite an existing term
//! - Reset the table when the storage layer faults
//!
//! ## Fault Policy
//! | Operation  | I/O fault            | Corruption           |
//! |------------|----------------------|----------------------|
//! | `store`    | reset, return error  | reset, return error  |
//! | `get`      | reset, `None`        | reset, `None`        |
//! | `remove`   | reset, `None`        | reset, `None`        |
//! | `contains` | `false`, no reset    | reset, `false`       |
//!
//! `contains` sits on the hot path, so a plain I/O hiccup there is not worth
//! throwing the shard away. Data lost to a reset stays in the backup file and
//! is never reloaded.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::container::{Container, TermHash};
use crate::error::{AssortError, Result};
use crate::layout::RowLayout;
use crate::record;
use crate::recovery;
use crate::table::{CacheStats, Insert, KeyIter, RowIter, Table, TableOptions};

/// Persistent store for all terms cited by exactly `capacity` documents
///
/// ## Concurrency
/// Every operation that can reset the table takes `&mut self`; callers that
/// share a store across threads must serialize access themselves. Iterators
/// hold no lock between steps and see concurrent changes unpredictably.
pub struct AssortmentStore {
    config: Config,
    /// Table file for this capacity
    path: PathBuf,
    layout: RowLayout,
    /// `None` only after a reset failed
    table: Option<Table>,
}

impl AssortmentStore {
    /// Open the store for `config.capacity`, creating it if needed
    ///
    /// An existing file that cannot be opened, or whose layout does not match
    /// the capacity, is moved to the backup directory and replaced by an
    /// empty table.
    pub fn open(config: Config) -> Result<Self> {
        let layout = RowLayout::for_capacity(config.capacity)?;

        fs::create_dir_all(&config.storage_root)?;
        let path = Self::file_path(&config.storage_root, config.capacity);
        let options = config.table_options();

        let table = if path.exists() {
            match Self::open_existing(&path, &layout, options) {
                Ok(table) => {
                    tracing::info!(
                        "Opened assortment table {:?}: {} entries, width {}, {} byte buffer",
                        path,
                        table.len(),
                        config.capacity,
                        config.buffer_size
                    );
                    table
                }
                Err(e) => {
                    tracing::error!(
                        "Unable to open assortment table {:?}, creating new: {}",
                        path,
                        e
                    );
                    recovery::discard(&path)?;
                    Self::create_table(&path, &layout, &config, options)?
                }
            }
        } else {
            Self::create_table(&path, &layout, &config, options)?
        };

        Ok(Self {
            config,
            path,
            layout,
            table: Some(table),
        })
    }

    /// File name used for a given capacity: `assortment_NNN.db`
    pub fn file_name(capacity: usize) -> String {
        format!("assortment_{:03}.db", capacity)
    }

    /// Full path of the table for `capacity` under `storage_root`
    pub fn file_path(storage_root: &Path, capacity: usize) -> PathBuf {
        storage_root.join(Self::file_name(capacity))
    }

    /// Store a container under its term hash
    ///
    /// Fails with `SizeMismatch` if the container does not hold exactly
    /// `capacity` references and with `DuplicateKey` if the term is already
    /// stored. A storage fault resets the table and the write is lost.
    pub fn store(&mut self, container: &Container) -> Result<()> {
        if container.len() != self.layout.capacity() {
            return Err(AssortError::SizeMismatch {
                expected: self.layout.capacity(),
                actual: container.len(),
            });
        }

        let row = record::encode(&self.layout, container);
        let result = self.table()?.insert(row);
        match result {
            Ok(Insert::Inserted) => Ok(()),
            Ok(Insert::Occupied(_)) => {
                Err(AssortError::DuplicateKey(container.term_hash().to_string()))
            }
            Err(e) if e.is_storage_fault() => {
                self.recover("store", &e)?;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Get the container stored for `term_hash`
    pub fn get(&mut self, term_hash: &TermHash) -> Result<Option<Container>> {
        let result = self
            .table()?
            .get(term_hash.as_bytes())
            .and_then(|row| self.decode_opt(row));

        self.absorb("get", result)
    }

    /// Remove and return the container stored for `term_hash`
    pub fn remove(&mut self, term_hash: &TermHash) -> Result<Option<Container>> {
        let result = self
            .table()?
            .remove(term_hash.as_bytes())
            .and_then(|row| self.decode_opt(row));

        self.absorb("remove", result)
    }

    /// Check whether `term_hash` is stored
    ///
    /// An I/O fault reads as `false` and leaves the table alone; corruption
    /// resets it.
    pub fn contains(&mut self, term_hash: &TermHash) -> Result<bool> {
        let result = self.table()?.get(term_hash.as_bytes());
        match result {
            Ok(row) => Ok(row.is_some()),
            Err(e) if e.is_io() => {
                tracing::debug!("contains {} on {:?}: {}", term_hash, self.path, e);
                Ok(false)
            }
            Err(e) if e.is_storage_fault() => {
                self.recover("contains", &e)?;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Walk term hashes in key order
    ///
    /// Starts at `start` (inclusive; `None` begins at the first key in the
    /// walk direction). With `wraparound`, the walk continues from the other
    /// end and stops just before `start`, visiting every key once.
    ///
    /// The walk is lazy and unisolated: terms stored or removed while it runs
    /// may or may not show up, and a table reset ends it.
    pub fn keys(
        &self,
        start: Option<&TermHash>,
        ascending: bool,
        wraparound: bool,
    ) -> Result<TermHashes> {
        let keys = self
            .table()?
            .keys(start.map(TermHash::as_bytes), ascending, wraparound);
        Ok(TermHashes { keys })
    }

    /// Walk raw rows in key order, for bulk export
    ///
    /// Rows can be turned into containers with [`AssortmentStore::decode`].
    pub fn records(&self) -> Result<RowIter> {
        Ok(self.table()?.rows())
    }

    /// Decode a raw row produced by [`AssortmentStore::records`]
    pub fn decode(&self, row: &[u8]) -> Result<Container> {
        record::decode(&self.layout, row)
    }

    /// Number of stored terms
    pub fn size(&self) -> usize {
        self.table.as_ref().map_or(0, Table::len)
    }

    /// Close the store, flushing the table
    ///
    /// Close failures are logged, not returned.
    pub fn close(mut self) {
        if let Some(table) = self.table.take() {
            if let Err(e) = table.close() {
                tracing::error!("Unable to close assortment table {:?}: {}", self.path, e);
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// References per record (N)
    pub fn capacity(&self) -> usize {
        self.layout.capacity()
    }

    pub fn layout(&self) -> &RowLayout {
        &self.layout
    }

    /// Path of the table file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory that receives files discarded by a reset
    pub fn backup_dir(&self) -> PathBuf {
        recovery::backup_dir(&self.config.storage_root)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Row cache counters (all zero while the table is unavailable)
    pub fn cache_stats(&self) -> CacheStats {
        self.table
            .as_ref()
            .map(Table::cache_stats)
            .unwrap_or_default()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn open_existing(path: &Path, layout: &RowLayout, options: TableOptions) -> Result<Table> {
        let table = Table::open(path, options)?;
        let stored = table.layout();
        if &stored != layout {
            if let Err(e) = table.close() {
                tracing::warn!("Ignoring close failure on {:?} with foreign layout: {}", path, e);
            }
            return Err(AssortError::Corruption(format!(
                "stored layout has {} columns ({} bytes per row), expected {} ({} bytes)",
                stored.column_count(),
                stored.row_width(),
                layout.column_count(),
                layout.row_width()
            )));
        }
        Ok(table)
    }

    fn create_table(
        path: &Path,
        layout: &RowLayout,
        config: &Config,
        options: TableOptions,
    ) -> Result<Table> {
        let table = Table::create(path, layout.clone(), options)?;
        tracing::info!(
            "Created new assortment table {:?}: width {}, {} byte buffer",
            path,
            config.capacity,
            config.buffer_size
        );
        Ok(table)
    }

    fn table(&self) -> Result<&Table> {
        self.table
            .as_ref()
            .ok_or_else(|| AssortError::Unavailable(self.path.clone()))
    }

    fn decode_opt(&self, row: Option<Vec<u8>>) -> Result<Option<Container>> {
        row.map(|row| record::decode(&self.layout, &row)).transpose()
    }

    /// Turn a storage fault into a reset plus "absent"
    fn absorb(
        &mut self,
        operation: &str,
        result: Result<Option<Container>>,
    ) -> Result<Option<Container>> {
        match result {
            Err(e) if e.is_storage_fault() => {
                self.recover(operation, &e)?;
                Ok(None)
            }
            other => other,
        }
    }

    /// Replace the table with an empty one after `cause`
    fn recover(&mut self, operation: &str, cause: &AssortError) -> Result<()> {
        tracing::error!(
            "{} on assortment {}: {} - resetting {:?}",
            operation,
            self.layout.capacity(),
            cause,
            self.path
        );

        let options = self.config.table_options();
        let fresh = match self.table.take() {
            Some(table) => recovery::reset(table, &self.path, self.layout.clone(), options)?,
            None => {
                recovery::discard(&self.path)?;
                Table::create(&self.path, self.layout.clone(), options)?
            }
        };
        self.table = Some(fresh);
        Ok(())
    }

    #[cfg(test)]
    fn inject_fault(&self, fault: crate::table::InjectedFault) {
        if let Some(table) = &self.table {
            table.inject_fault(fault);
        }
    }
}

/// Term hashes produced by [`AssortmentStore::keys`]
pub struct TermHashes {
    keys: KeyIter,
}

impl Iterator for TermHashes {
    type Item = TermHash;

    fn next(&mut self) -> Option<Self::Item> {
        // Keys are always written at the layout's key width
        self.keys.find_map(|key| TermHash::from_slice(&key).ok())
    }
}
