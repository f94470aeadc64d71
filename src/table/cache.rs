//! Row Cache
//!
//! Byte-bounded FIFO cache of decoded rows, sized by the configured buffer.
//!
//! Removal only drops the row; its slot in the insertion queue goes stale and
//! is skipped at eviction time. Each cached row carries the sequence number
//! of its live slot, so a key that was removed and cached again is not
//! evicted through its old slot. Stale slots are compacted away once they
//! outnumber the live ones.

use std::collections::{HashMap, VecDeque};

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Configured budget in bytes
    pub capacity_bytes: usize,
    /// Bytes currently held
    pub used_bytes: usize,
    /// Rows currently held
    pub rows: usize,
    pub hits: u64,
    pub misses: u64,
}

pub(super) struct RowCache {
    capacity_bytes: usize,
    used_bytes: usize,
    /// Key → (row, sequence number of its live slot in `order`)
    rows: HashMap<Vec<u8>, (Vec<u8>, u64)>,
    /// Insertion order, oldest first; may hold stale slots
    order: VecDeque<(Vec<u8>, u64)>,
    next_seq: u64,
    hits: u64,
    misses: u64,
}

impl RowCache {
    pub(super) fn new(capacity_bytes: usize) -> Self {
        Self {
            capacity_bytes,
            used_bytes: 0,
            rows: HashMap::new(),
            order: VecDeque::new(),
            next_seq: 0,
            hits: 0,
            misses: 0,
        }
    }

    pub(super) fn get(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        match self.rows.get(key) {
            Some((row, _)) => {
                self.hits += 1;
                Some(row.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Cache a row; returns false if it does not fit at all
    pub(super) fn insert(&mut self, key: Vec<u8>, row: Vec<u8>) -> bool {
        let cost = key.len() + row.len();
        if cost > self.capacity_bytes {
            self.remove(&key);
            return false;
        }

        self.remove(&key);
        while self.used_bytes + cost > self.capacity_bytes {
            match self.order.pop_front() {
                Some((oldest, seq)) => {
                    let live = matches!(self.rows.get(&oldest), Some((_, s)) if *s == seq);
                    if live {
                        if let Some((evicted, _)) = self.rows.remove(&oldest) {
                            self.used_bytes -= oldest.len() + evicted.len();
                        }
                    }
                }
                None => break,
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.used_bytes += cost;
        self.order.push_back((key.clone(), seq));
        self.rows.insert(key, (row, seq));
        true
    }

    pub(super) fn remove(&mut self, key: &[u8]) {
        if let Some((row, _)) = self.rows.remove(key) {
            self.used_bytes -= key.len() + row.len();
            self.compact_if_stale();
        }
    }

    /// Drop stale queue slots once they outnumber the live rows
    fn compact_if_stale(&mut self) {
        if self.order.len() <= 2 * self.rows.len() + 16 {
            return;
        }
        let rows = &self.rows;
        self.order
            .retain(|(key, seq)| matches!(rows.get(key), Some((_, s)) if s == seq));
    }

    /// True when another row of `cost` bytes fits without eviction
    pub(super) fn has_room(&self, cost: usize) -> bool {
        self.used_bytes + cost <= self.capacity_bytes
    }

    pub(super) fn clear(&mut self) {
        self.rows.clear();
        self.order.clear();
        self.used_bytes = 0;
    }

    pub(super) fn stats(&self) -> CacheStats {
        CacheStats {
            capacity_bytes: self.capacity_bytes,
            used_bytes: self.used_bytes,
            rows: self.rows.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}
