//! Record Codec
//!
//! Converts containers to raw rows and back, using a [`RowLayout`] for every
//! column position.

use bytes::{Buf, BufMut};

use crate::container::{Container, DocHash, DocRef, TermHash};
use crate::error::{AssortError, Result};
use crate::layout::{RowLayout, COUNTER_COLUMN, KEY_COLUMN, TIMESTAMP_COLUMN};

/// Value written to the occurrence counter column.
///
/// Always 1, independent of capacity or any running tally.
pub const OCCURRENCE_MARKER: u32 = 1;

/// Encode a container into a row.
///
/// The caller must have checked that `container.len()` equals the layout's
/// capacity; extra references are ignored and missing ones leave zeroed
/// columns.
pub fn encode(layout: &RowLayout, container: &Container) -> Vec<u8> {
    let mut row = vec![0u8; layout.row_width()];

    row[layout.column(KEY_COLUMN)].copy_from_slice(container.term_hash().as_bytes());
    (&mut row[layout.column(COUNTER_COLUMN)]).put_u32(OCCURRENCE_MARKER);
    (&mut row[layout.column(TIMESTAMP_COLUMN)]).put_i64(container.updated());

    for (i, doc_ref) in container.iter().take(layout.capacity()).enumerate() {
        row[layout.doc_hash_column(i)].copy_from_slice(doc_ref.doc_hash().as_bytes());

        // Attribute column stays NUL-padded past the blob
        let attrs = doc_ref.attributes();
        let column = layout.attributes_column(i);
        row[column.start..column.start + attrs.len()].copy_from_slice(attrs);
    }

    row
}

/// Decode a row into a container.
pub fn decode(layout: &RowLayout, row: &[u8]) -> Result<Container> {
    if row.len() != layout.row_width() {
        return Err(AssortError::Corruption(format!(
            "row is {} bytes, layout expects {}",
            row.len(),
            layout.row_width()
        )));
    }

    let term_hash = TermHash::from_slice(&row[layout.column(KEY_COLUMN)])?;
    let updated = (&row[layout.column(TIMESTAMP_COLUMN)]).get_i64();

    let capacity = layout.capacity();
    let mut refs = Vec::with_capacity(capacity);
    for i in 0..capacity {
        let doc_hash = DocHash::from_slice(&row[layout.doc_hash_column(i)])?;
        let attrs = &row[layout.attributes_column(i)];
        let end = attrs.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
        refs.push(DocRef::new(doc_hash, &attrs[..end])?);
    }

    Ok(Container::new(term_hash, updated, refs))
}

/// Read the occurrence counter of a row.
pub fn occurrence_marker(layout: &RowLayout, row: &[u8]) -> u32 {
    (&row[layout.column(COUNTER_COLUMN)]).get_u32()
}
