//! # AssortDB
//!
//! Persistent assortment shards for an inverted word index:
//! - One shard per capacity N, holding every term cited by exactly N documents
//! - Fixed-width rows whose layout is computed from N
//! - Insert-only writes (a term is never silently overwritten)
//! - Self-healing: a corrupted shard is backed up and replaced by an empty one
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Word Index (caller)                       │
//! │          (routes a term to the shard for its count)          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Container
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   AssortmentStore (N)                        │
//! │      store / get / remove / contains / keys / records        │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │ on storage fault
//!            ▼                                  ▼
//!   ┌─────────────────┐                 ┌───────────────┐
//!   │ RowLayout +     │                 │   Recovery    │
//!   │ record codec    │                 │ (backup+reset)│
//!   └────────┬────────┘                 └───────┬───────┘
//!            │ rows                             │
//!            ▼                                  ▼
//!   ┌─────────────────────────────────────────────────┐
//!   │          Table (log + index + row cache)        │
//!   └─────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod layout;
pub mod container;
pub mod record;
pub mod table;
pub mod recovery;
pub mod assortment;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{AssortError, Result};
pub use config::{Config, SyncStrategy};
pub use container::{Container, DocHash, DocRef, TermHash};
pub use layout::RowLayout;
pub use assortment::{AssortmentStore, TermHashes};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of AssortDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
