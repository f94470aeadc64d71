//! Table implementation
//!
//! Single-file ordered table: append-only entry log, in-memory key index and
//! a bounded row cache.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use crate::config::SyncStrategy;
use crate::error::{AssortError, Result};
use crate::layout::RowLayout;

use super::cache::{CacheStats, RowCache};
use super::entry::{self, Frame, Operation};
use super::header;
use super::iterator::{KeyIter, RowIter};
use super::{Insert, TableOptions};

/// Persistent ordered table of fixed-width rows
///
/// ## Concurrency:
/// - All state sits behind one `RwLock`; every method takes `&self`
/// - Lookups take the write lock because reading a row moves the file cursor
/// - Iterators share the lock and re-read the live index on every step
pub struct Table {
    pub(super) inner: Arc<RwLock<TableInner>>,
}

pub(super) struct TableInner {
    path: PathBuf,
    layout: RowLayout,
    /// Random-access read handle
    reader: File,
    /// Append handle for new entries
    writer: BufWriter<File>,
    /// Offset where the next entry will be written
    end_offset: u64,
    /// Key → offset of the newest `Put` entry
    pub(super) index: BTreeMap<Vec<u8>, u64>,
    cache: RowCache,
    sync_strategy: SyncStrategy,
    unsynced_writes: usize,
    pub(super) closed: bool,
    #[cfg(test)]
    fault: Option<InjectedFault>,
}

/// Fault to raise on the next table operation (tests only)
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InjectedFault {
    Io,
    Corruption,
}

impl Table {
    /// Create a new, empty table at `path`, replacing any existing file
    pub fn create(path: &Path, layout: RowLayout, options: TableOptions) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let end_offset = header::write(&mut file, &layout)?;
        file.sync_all()?;

        let cache = RowCache::new(options.cache_bytes);
        Self::from_parts(path, layout, end_offset, BTreeMap::new(), cache, options)
    }

    /// Open an existing table, replaying its log
    ///
    /// On open:
    /// 1. Read and validate the header (layout)
    /// 2. Replay every entry into the index
    /// 3. Cache rows while the preload budget lasts
    /// 4. Cut off a torn entry at the tail, if any
    pub fn open(path: &Path, options: TableOptions) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let (layout, header_size) = header::read(&mut reader)?;

        // No deadline when the budget reaches past the end of time
        let deadline = Instant::now().checked_add(options.preload_budget);
        let mut cache = RowCache::new(options.cache_bytes);
        let mut index = BTreeMap::new();
        let mut offset = header_size;

        loop {
            match entry::read_frame(&mut reader)? {
                Frame::Entry(Operation::Put { row }, size) => {
                    if row.len() != layout.row_width() {
                        return Err(AssortError::Corruption(format!(
                            "Row at offset {} is {} bytes, layout expects {}",
                            offset,
                            row.len(),
                            layout.row_width()
                        )));
                    }
                    let key = layout.key_of(&row).to_vec();
                    let preloading = deadline.map_or(true, |d| Instant::now() < d);
                    if preloading && cache.has_room(key.len() + row.len()) {
                        cache.insert(key.clone(), row);
                    } else {
                        cache.remove(&key);
                    }
                    index.insert(key, offset);
                    offset += size;
                }
                Frame::Entry(Operation::Delete { key }, size) => {
                    cache.remove(&key);
                    index.remove(&key);
                    offset += size;
                }
                Frame::End => break,
                Frame::Torn => {
                    tracing::warn!(
                        "Table {:?}: torn entry at offset {}, truncating {} bytes",
                        path,
                        offset,
                        file_len - offset
                    );
                    let file = OpenOptions::new().write(true).open(path)?;
                    file.set_len(offset)?;
                    file.sync_all()?;
                    break;
                }
            }
        }

        tracing::debug!(
            "Table {:?}: replayed {} live rows, {} cached",
            path,
            index.len(),
            cache.stats().rows
        );

        Self::from_parts(path, layout, offset, index, cache, options)
    }

    fn from_parts(
        path: &Path,
        layout: RowLayout,
        end_offset: u64,
        index: BTreeMap<Vec<u8>, u64>,
        cache: RowCache,
        options: TableOptions,
    ) -> Result<Self> {
        let reader = File::open(path)?;
        let writer = OpenOptions::new().append(true).open(path)?;

        let inner = TableInner {
            path: path.to_path_buf(),
            layout,
            reader,
            writer: BufWriter::new(writer),
            end_offset,
            index,
            cache,
            sync_strategy: options.sync_strategy,
            unsynced_writes: 0,
            closed: false,
            #[cfg(test)]
            fault: None,
        };

        Ok(Self {
            inner: Arc::new(RwLock::new(inner)),
        })
    }

    /// Get the row stored for `key`
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut inner = self.inner.write();
        inner.check_fault()?;
        inner.lookup(key)
    }

    /// Write `row` unless its key is already present
    ///
    /// An existing row is never overwritten; it is handed back as
    /// [`Insert::Occupied`].
    pub fn insert(&self, row: Vec<u8>) -> Result<Insert> {
        let mut inner = self.inner.write();
        inner.check_fault()?;

        if row.len() != inner.layout.row_width() {
            return Err(AssortError::Config(format!(
                "row is {} bytes, table expects {}",
                row.len(),
                inner.layout.row_width()
            )));
        }

        let key = inner.layout.key_of(&row).to_vec();
        if let Some(existing) = inner.lookup(&key)? {
            return Ok(Insert::Occupied(existing));
        }

        let offset = inner.append(&Operation::Put { row: row.clone() })?;
        inner.index.insert(key.clone(), offset);
        inner.cache.insert(key, row);

        Ok(Insert::Inserted)
    }

    /// Remove the row for `key`, returning it
    pub fn remove(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut inner = self.inner.write();
        inner.check_fault()?;

        let row = match inner.lookup(key)? {
            Some(row) => row,
            None => return Ok(None),
        };

        inner.append(&Operation::Delete { key: key.to_vec() })?;
        inner.index.remove(key);
        inner.cache.remove(key);

        Ok(Some(row))
    }

    /// Walk keys starting at `start` (inclusive)
    ///
    /// `ascending` picks the direction. With `rotate`, the walk continues from
    /// the opposite end after passing the last key, stopping before `start`,
    /// so every key is produced once.
    pub fn keys(&self, start: Option<&[u8]>, ascending: bool, rotate: bool) -> KeyIter {
        KeyIter::new(Arc::clone(&self.inner), start.map(<[u8]>::to_vec), ascending, rotate)
    }

    /// Walk all rows in key order
    pub fn rows(&self) -> RowIter {
        RowIter::new(Arc::clone(&self.inner))
    }

    /// Number of live rows
    pub fn len(&self) -> usize {
        self.inner.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn layout(&self) -> RowLayout {
        self.inner.read().layout.clone()
    }

    pub fn path(&self) -> PathBuf {
        self.inner.read().path.clone()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.read().cache.stats()
    }

    /// Flush buffered writes and fsync the file
    pub fn sync(&self) -> Result<()> {
        self.inner.write().sync()
    }

    /// Flush, fsync and release the table
    ///
    /// Outstanding iterators stop producing items.
    pub fn close(self) -> Result<()> {
        let mut inner = self.inner.write();
        inner.closed = true;
        inner.index.clear();
        inner.cache.clear();
        inner.sync()
    }

    #[cfg(test)]
    pub(crate) fn inject_fault(&self, fault: InjectedFault) {
        self.inner.write().fault = Some(fault);
    }
}

impl TableInner {
    /// Look up a row through the cache
    pub(super) fn lookup(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let offset = match self.index.get(key) {
            Some(&offset) => offset,
            None => return Ok(None),
        };

        if let Some(row) = self.cache.get(key) {
            return Ok(Some(row));
        }

        let row = self.read_row_at(offset, key)?;
        self.cache.insert(key.to_vec(), row.clone());
        Ok(Some(row))
    }

    /// Read the `Put` entry at `offset`, checking it belongs to `key`
    pub(super) fn read_row_at(&mut self, offset: u64, key: &[u8]) -> Result<Vec<u8>> {
        self.reader.seek(SeekFrom::Start(offset))?;
        match entry::read_known_frame(&mut self.reader)? {
            Operation::Put { row }
                if row.len() == self.layout.row_width() && self.layout.key_of(&row) == key =>
            {
                Ok(row)
            }
            other => Err(AssortError::Corruption(format!(
                "Index points at offset {} but found {}",
                offset,
                describe(&other)
            ))),
        }
    }

    /// Append an entry, returning the offset it was written at
    fn append(&mut self, operation: &Operation) -> Result<u64> {
        let offset = self.end_offset;
        let written = operation.write_to(&mut self.writer)?;
        // Readers use a separate handle; make the entry visible to them
        self.writer.flush()?;
        self.end_offset += written;

        self.unsynced_writes += 1;
        let due = match self.sync_strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNWrites { count } => self.unsynced_writes >= count.max(1),
        };
        if due {
            self.sync()?;
        }

        Ok(offset)
    }

    fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.unsynced_writes = 0;
        Ok(())
    }

    fn check_fault(&mut self) -> Result<()> {
        #[cfg(test)]
        {
            if let Some(fault) = self.fault.take() {
                return Err(match fault {
                    InjectedFault::Io => AssortError::Io(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "injected I/O fault",
                    )),
                    InjectedFault::Corruption => {
                        AssortError::Corruption("injected corruption".to_string())
                    }
                });
            }
        }
        Ok(())
    }
}

fn describe(operation: &Operation) -> String {
    match operation {
        Operation::Put { row } => format!("a {}-byte row for another key", row.len()),
        Operation::Delete { .. } => "a delete entry".to_string(),
    }
}
