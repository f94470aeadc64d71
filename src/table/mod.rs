//! Table Module
//!
//! The backing ordered store: one file, one fixed row layout, rows keyed by
//! their first column.
//!
//! ## Responsibilities
//! - Persist rows durably in an append-only log
//! - Keep an in-memory ordered index (key → log offset)
//! - Cache recently used rows within a byte budget
//! - Report faults as either I/O errors or corruption
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header                                                  │
//! │   Magic: "ASRT" (4) | Version: u16 (2) | Columns: u32   │
//! │   Width: u32 × Columns | HeaderCRC: u32 (4)             │
//! ├─────────────────────────────────────────────────────────┤
//! │ Entry Log (variable)                                    │
//! │   [CRC: u32][Len: u32][bincode(Operation)]              │
//! │   ... repeated for each put / delete ...                │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The newest entry for a key wins. A torn entry at the tail (crash during
//! append) is cut off when the table is opened; a checksum mismatch anywhere
//! else is reported as corruption.

mod cache;
mod entry;
mod file;
mod header;
mod iterator;

use std::time::Duration;

use crate::config::SyncStrategy;

pub use cache::CacheStats;
pub use entry::Operation;
pub use file::Table;
pub use iterator::{KeyIter, RowIter};

#[cfg(test)]
pub(crate) use file::InjectedFault;

// =============================================================================
// Shared Constants
// =============================================================================

/// Magic bytes identifying an assortment table file
pub(crate) const MAGIC: &[u8; 4] = b"ASRT";

/// Current table format version
pub(crate) const VERSION: u16 = 1;

/// Entry header size: CRC (4) + Len (4)
pub(crate) const ENTRY_HEADER_SIZE: u64 = 8;

/// Upper bound on a single entry payload (guards against garbage lengths)
pub(crate) const MAX_ENTRY_SIZE: u32 = 64 * 1024 * 1024;

/// Bytes bincode adds around a row in a `Put` payload: variant tag (4) + length (8)
pub(crate) const PUT_ENTRY_OVERHEAD: usize = 12;

// =============================================================================
// Options and Results
// =============================================================================

/// Runtime options for opening or creating a table
#[derive(Debug, Clone, Copy)]
pub struct TableOptions {
    /// Row cache budget in bytes
    pub cache_bytes: usize,
    /// Time spent caching rows while the log is replayed
    pub preload_budget: Duration,
    /// When to fsync after writes
    pub sync_strategy: SyncStrategy,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            cache_bytes: 1024 * 1024,
            preload_budget: Duration::ZERO,
            sync_strategy: SyncStrategy::EveryWrite,
        }
    }
}

/// Outcome of an insert-only write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insert {
    /// The row was written
    Inserted,
    /// A row already existed for the key; it is returned untouched
    Occupied(Vec<u8>),
}
