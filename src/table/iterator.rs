//! Table Iterators
//!
//! Lazy cursors over the live index. Each step takes the table lock, finds the
//! key after the cursor and releases the lock again, so writes made during a
//! walk may or may not be observed. Nothing is snapshotted.

use std::ops::Bound;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;

use super::file::TableInner;

/// Ordered walk over keys, optionally wrapping around
pub struct KeyIter {
    table: Arc<RwLock<TableInner>>,
    start: Option<Vec<u8>>,
    ascending: bool,
    rotate: bool,
    /// Last key produced in the current leg
    cursor: Option<Vec<u8>>,
    /// True once the walk has wrapped past the end
    wrapped: bool,
    done: bool,
}

impl KeyIter {
    pub(super) fn new(
        table: Arc<RwLock<TableInner>>,
        start: Option<Vec<u8>>,
        ascending: bool,
        rotate: bool,
    ) -> Self {
        Self {
            table,
            start,
            ascending,
            rotate,
            cursor: None,
            wrapped: false,
            done: false,
        }
    }

    /// Bounds of the remaining walk in the current leg
    fn bounds(&self) -> (Bound<&[u8]>, Bound<&[u8]>) {
        let cursor = self.cursor.as_deref().map(Bound::Excluded);
        let start = self.start.as_deref();

        match (self.ascending, self.wrapped) {
            // start ..= max
            (true, false) => (
                cursor.unwrap_or_else(|| start.map_or(Bound::Unbounded, Bound::Included)),
                Bound::Unbounded,
            ),
            // min .. start
            (true, true) => (
                cursor.unwrap_or(Bound::Unbounded),
                start.map_or(Bound::Unbounded, Bound::Excluded),
            ),
            // min ..= start, walked downwards
            (false, false) => (
                Bound::Unbounded,
                cursor.unwrap_or_else(|| start.map_or(Bound::Unbounded, Bound::Included)),
            ),
            // start .. max, walked downwards
            (false, true) => (
                start.map_or(Bound::Unbounded, Bound::Excluded),
                cursor.unwrap_or(Bound::Unbounded),
            ),
        }
    }
}

impl Iterator for KeyIter {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let table = Arc::clone(&self.table);
        let inner = table.read();
        if inner.closed {
            self.done = true;
            return None;
        }

        loop {
            let (lo, hi) = self.bounds();
            let found = if is_empty_range(lo, hi) {
                None
            } else {
                let mut range = inner.index.range::<[u8], _>((lo, hi));
                let next = if self.ascending {
                    range.next()
                } else {
                    range.next_back()
                };
                next.map(|(k, _)| k.clone())
            };

            match found {
                Some(key) => {
                    self.cursor = Some(key.clone());
                    return Some(key);
                }
                None if self.rotate && !self.wrapped && self.start.is_some() => {
                    self.wrapped = true;
                    self.cursor = None;
                }
                None => {
                    self.done = true;
                    return None;
                }
            }
        }
    }
}

/// Ordered walk over full rows
pub struct RowIter {
    table: Arc<RwLock<TableInner>>,
    cursor: Option<Vec<u8>>,
    done: bool,
}

impl RowIter {
    pub(super) fn new(table: Arc<RwLock<TableInner>>) -> Self {
        Self {
            table,
            cursor: None,
            done: false,
        }
    }
}

impl Iterator for RowIter {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let table = Arc::clone(&self.table);
        let mut inner = table.write();
        if inner.closed {
            self.done = true;
            return None;
        }

        let lo = match self.cursor.as_deref() {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };
        let next = inner
            .index
            .range::<[u8], _>((lo, Bound::Unbounded))
            .next()
            .map(|(k, &offset)| (k.clone(), offset));

        match next {
            Some((key, offset)) => {
                let row = inner.read_row_at(offset, &key);
                if row.is_err() {
                    // A broken row ends the walk
                    self.done = true;
                }
                self.cursor = Some(key);
                Some(row)
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

/// True if `(lo, hi)` cannot contain any key (and would make `range` panic)
fn is_empty_range(lo: Bound<&[u8]>, hi: Bound<&[u8]>) -> bool {
    match (lo, hi) {
        (Bound::Included(a), Bound::Included(b)) => a > b,
        (Bound::Included(a), Bound::Excluded(b))
        | (Bound::Excluded(a), Bound::Included(b))
        | (Bound::Excluded(a), Bound::Excluded(b)) => a >= b,
        _ => false,
    }
}
