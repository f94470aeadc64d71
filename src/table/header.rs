//! Table Header
//!
//! Persists the row layout at the start of the file so an existing table can
//! be checked against the layout its owner expects.

use std::io::{ErrorKind, Read, Write};

use crate::error::{AssortError, Result};
use crate::layout::{RowLayout, MAX_COLUMNS};

use super::{MAGIC, VERSION};

/// Serialize the header for `layout`
pub(super) fn encode(layout: &RowLayout) -> Vec<u8> {
    let mut buf = Vec::with_capacity(14 + 4 * layout.column_count());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&VERSION.to_le_bytes());
    buf.extend_from_slice(&(layout.column_count() as u32).to_le_bytes());
    for &width in layout.widths() {
        buf.extend_from_slice(&(width as u32).to_le_bytes());
    }
    let crc = crc32fast::hash(&buf);
    buf.extend_from_slice(&crc.to_le_bytes());
    buf
}

/// Write the header for `layout`, returning its size in bytes
pub(super) fn write<W: Write>(w: &mut W, layout: &RowLayout) -> Result<u64> {
    let buf = encode(layout);
    w.write_all(&buf)?;
    Ok(buf.len() as u64)
}

/// Read and validate a header, returning the stored layout and header size
pub(super) fn read<R: Read>(r: &mut R) -> Result<(RowLayout, u64)> {
    let mut hasher = crc32fast::Hasher::new();

    let mut fixed = [0u8; 10];
    read_exact(r, &mut fixed)?;
    hasher.update(&fixed);

    if &fixed[0..4] != MAGIC {
        return Err(AssortError::Corruption(format!(
            "Invalid table magic: expected ASRT, got {:?}",
            &fixed[0..4]
        )));
    }

    let version = u16::from_le_bytes([fixed[4], fixed[5]]);
    if version != VERSION {
        return Err(AssortError::Corruption(format!(
            "Unsupported table version: {}",
            version
        )));
    }

    let columns = u32::from_le_bytes([fixed[6], fixed[7], fixed[8], fixed[9]]);
    if columns == 0 || columns as usize > MAX_COLUMNS {
        return Err(AssortError::Corruption(format!(
            "Implausible column count: {}",
            columns
        )));
    }

    let mut raw_widths = vec![0u8; columns as usize * 4];
    read_exact(r, &mut raw_widths)?;
    hasher.update(&raw_widths);

    let mut stored_crc = [0u8; 4];
    read_exact(r, &mut stored_crc)?;
    if u32::from_le_bytes(stored_crc) != hasher.finalize() {
        return Err(AssortError::Corruption("Header checksum mismatch".to_string()));
    }

    let widths = raw_widths
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]) as usize)
        .collect();
    let layout = RowLayout::from_widths(widths)
        .map_err(|e| AssortError::Corruption(format!("Invalid stored layout: {}", e)))?;

    let size = 10 + raw_widths.len() as u64 + 4;
    Ok((layout, size))
}

/// `read_exact` that reports a short file as corruption
fn read_exact<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<()> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => AssortError::Corruption("Truncated table header".to_string()),
        _ => AssortError::Io(e),
    })
}
