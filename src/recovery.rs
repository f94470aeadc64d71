//! Corruption Recovery
//!
//! Resets a damaged assortment table: the old file is moved aside (or
//! deleted) and an empty table with the same layout takes its place.
//!
//! ## Steps
//! 1. Close the current handle, ignoring errors
//! 2. Move the file into `{storage_root}/backup/` with a timestamp suffix
//! 3. If the move fails, delete the file; if that fails too, give up
//! 4. Create a fresh, empty table
//!
//! The operation that hit the fault is not retried.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AssortError, Result};
use crate::layout::RowLayout;
use crate::table::{Table, TableOptions};

/// Name of the directory holding discarded files, under the storage root
pub const BACKUP_DIR: &str = "backup";

/// Close `table` (best effort) and replace its file with an empty table
pub fn reset(
    table: Table,
    path: &Path,
    layout: RowLayout,
    options: TableOptions,
) -> Result<Table> {
    if let Err(e) = table.close() {
        tracing::warn!("Ignoring close failure on {:?} before reset: {}", path, e);
    }

    discard(path)?;

    let table = Table::create(path, layout, options)?;
    tracing::info!("Created empty replacement table {:?}", path);
    Ok(table)
}

/// Move `path` into the backup directory, or delete it if that fails
///
/// Returns the backup location when the move succeeded.
pub fn discard(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }

    match move_to_backup(path) {
        Ok(backup) => {
            tracing::info!("A back-up of the discarded table is in {:?}", backup);
            Ok(Some(backup))
        }
        Err(e) => {
            tracing::warn!("Cannot back up {:?} ({}), deleting it", path, e);
            fs::remove_file(path).map_err(|source| AssortError::RecoveryFatal {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(None)
        }
    }
}

/// Backup directory for tables stored directly under `storage_root`
pub fn backup_dir(storage_root: &Path) -> PathBuf {
    storage_root.join(BACKUP_DIR)
}

fn move_to_backup(path: &Path) -> std::io::Result<PathBuf> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let dir = backup_dir(parent);
    fs::create_dir_all(&dir)?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);

    let mut backup = dir.join(format!("{}.{}", name, millis));
    let mut attempt = 1;
    while backup.exists() {
        backup = dir.join(format!("{}.{}-{}", name, millis, attempt));
        attempt += 1;
    }

    fs::rename(path, &backup)?;
    Ok(backup)
}
