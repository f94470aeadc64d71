//! Row Layout
//!
//! Builds the fixed-width record layout for an assortment of capacity N.
//!
//! ## Record Format
//! ```text
//! ┌────────────┬───────────┬─────────────┬──────────────────────────────┐
//! │ Term (12)  │ Count (4) │ Updated (8) │ N × [DocHash (12)][Attr (64)]│
//! └────────────┴───────────┴─────────────┴──────────────────────────────┘
//! ```
//!
//! All offset arithmetic lives here. The layout is computed once and shared by
//! the table header, the record codec and every lookup.

use std::ops::Range;

use crate::error::{AssortError, Result};
use crate::table::{MAX_ENTRY_SIZE, PUT_ENTRY_OVERHEAD};

/// Length of a term hash (the row key)
pub const TERM_HASH_LEN: usize = 12;

/// Length of the occurrence counter column
pub const COUNTER_LEN: usize = 4;

/// Length of the update timestamp column
pub const TIMESTAMP_LEN: usize = 8;

/// Length of a document hash
pub const DOC_HASH_LEN: usize = 12;

/// Maximum length of encoded document attributes
pub const ATTRIBUTES_LEN: usize = 64;

/// Columns before the first document reference
const FIXED_COLUMNS: usize = 3;

/// Columns per document reference
const COLUMNS_PER_REF: usize = 2;

/// Most columns a table header can declare
pub const MAX_COLUMNS: usize = 1 << 20;

/// Largest capacity whose header and rows fit the table format
pub const MAX_CAPACITY: usize = max_capacity();

/// Index of the key column
pub const KEY_COLUMN: usize = 0;

/// Index of the occurrence counter column
pub const COUNTER_COLUMN: usize = 1;

/// Index of the update timestamp column
pub const TIMESTAMP_COLUMN: usize = 2;

const fn max_capacity() -> usize {
    let fixed_width = TERM_HASH_LEN + COUNTER_LEN + TIMESTAMP_LEN;
    let ref_width = DOC_HASH_LEN + ATTRIBUTES_LEN;

    let by_columns = (MAX_COLUMNS - FIXED_COLUMNS) / COLUMNS_PER_REF;
    let by_entry = (MAX_ENTRY_SIZE as usize - PUT_ENTRY_OVERHEAD - fixed_width) / ref_width;

    if by_columns < by_entry {
        by_columns
    } else {
        by_entry
    }
}

/// Fixed-width column layout of one assortment row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLayout {
    /// Width of each column, in order
    widths: Vec<usize>,
    /// Start offset of each column
    offsets: Vec<usize>,
    /// Sum of all widths
    row_width: usize,
}

impl RowLayout {
    /// Build the layout for an assortment holding `capacity` references per term.
    pub fn for_capacity(capacity: usize) -> Result<Self> {
        if capacity < 1 {
            return Err(AssortError::Config(format!(
                "assortment capacity must be at least 1, got {}",
                capacity
            )));
        }
        if capacity > MAX_CAPACITY {
            return Err(AssortError::Config(format!(
                "assortment capacity {} exceeds the maximum of {}",
                capacity, MAX_CAPACITY
            )));
        }

        let mut widths = Vec::with_capacity(FIXED_COLUMNS + COLUMNS_PER_REF * capacity);
        widths.push(TERM_HASH_LEN);
        widths.push(COUNTER_LEN);
        widths.push(TIMESTAMP_LEN);
        for _ in 0..capacity {
            widths.push(DOC_HASH_LEN);
            widths.push(ATTRIBUTES_LEN);
        }

        Self::from_widths(widths)
    }

    /// Rebuild a layout from raw column widths (e.g. read from a table header).
    pub fn from_widths(widths: Vec<usize>) -> Result<Self> {
        if widths.is_empty() || widths[KEY_COLUMN] == 0 {
            return Err(AssortError::Config(
                "layout needs a non-empty key column".to_string(),
            ));
        }
        if widths.len() > MAX_COLUMNS {
            return Err(AssortError::Config(format!(
                "layout has {} columns, at most {} are supported",
                widths.len(),
                MAX_COLUMNS
            )));
        }

        let mut offsets = Vec::with_capacity(widths.len());
        let mut row_width = 0usize;
        for &width in &widths {
            offsets.push(row_width);
            row_width = row_width.checked_add(width).ok_or_else(|| {
                AssortError::Config("layout row width overflows".to_string())
            })?;
        }

        Ok(Self {
            widths,
            offsets,
            row_width,
        })
    }

    /// Number of document references per row, or 0 if this layout does not
    /// follow the assortment shape.
    pub fn capacity(&self) -> usize {
        let cols = self.widths.len();
        if cols < FIXED_COLUMNS || (cols - FIXED_COLUMNS) % COLUMNS_PER_REF != 0 {
            return 0;
        }
        (cols - FIXED_COLUMNS) / COLUMNS_PER_REF
    }

    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    pub fn column_count(&self) -> usize {
        self.widths.len()
    }

    /// Total bytes per row
    pub fn row_width(&self) -> usize {
        self.row_width
    }

    /// Width of the key column
    pub fn key_width(&self) -> usize {
        self.widths[KEY_COLUMN]
    }

    /// Byte range of column `index` within a row
    ///
    /// Panics if `index` is out of bounds.
    pub fn column(&self, index: usize) -> Range<usize> {
        let start = self.offsets[index];
        start..start + self.widths[index]
    }

    /// Byte range of the document hash of reference `i`
    pub fn doc_hash_column(&self, i: usize) -> Range<usize> {
        self.column(FIXED_COLUMNS + COLUMNS_PER_REF * i)
    }

    /// Byte range of the attributes of reference `i`
    pub fn attributes_column(&self, i: usize) -> Range<usize> {
        self.column(FIXED_COLUMNS + COLUMNS_PER_REF * i + 1)
    }

    /// Extract the key from a full row
    pub fn key_of<'a>(&self, row: &'a [u8]) -> &'a [u8] {
        &row[self.column(KEY_COLUMN)]
    }
}
