//! Log Entry definitions
//!
//! Defines the operations recorded in the table log and their framing.

use std::io::{ErrorKind, Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{AssortError, Result};

use super::{ENTRY_HEADER_SIZE, MAX_ENTRY_SIZE};

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Store a full row (key is the row's first column)
    Put { row: Vec<u8> },

    /// Remove the row for a key
    Delete { key: Vec<u8> },
}

impl Operation {
    /// Frame the operation as `[crc][len][payload]`
    pub(super) fn to_frame(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)?;
        if payload.len() > MAX_ENTRY_SIZE as usize {
            return Err(AssortError::Config(format!(
                "Entry of {} bytes exceeds the {} byte limit",
                payload.len(),
                MAX_ENTRY_SIZE
            )));
        }
        let crc = crc32fast::hash(&payload);

        let mut frame = Vec::with_capacity(ENTRY_HEADER_SIZE as usize + payload.len());
        frame.extend_from_slice(&crc.to_le_bytes());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&payload);
        Ok(frame)
    }

    /// Write a framed operation, returning the number of bytes written
    pub(super) fn write_to<W: Write>(&self, w: &mut W) -> Result<u64> {
        let frame = self.to_frame()?;
        w.write_all(&frame)?;
        Ok(frame.len() as u64)
    }
}

/// Result of reading one frame during replay
pub(super) enum Frame {
    /// A valid operation and its total frame size
    Entry(Operation, u64),
    /// Clean end of file at a frame boundary
    End,
    /// The file ends in the middle of a frame
    Torn,
}

/// Read the next frame, distinguishing a clean end from a torn tail
pub(super) fn read_frame<R: Read>(r: &mut R) -> Result<Frame> {
    let mut header = [0u8; ENTRY_HEADER_SIZE as usize];
    let mut filled = 0;
    while filled < header.len() {
        match r.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(Frame::End),
            Ok(0) => return Ok(Frame::Torn),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    let (crc, len) = parse_header(&header)?;

    let mut payload = vec![0u8; len as usize];
    match r.read_exact(&mut payload) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(Frame::Torn),
        Err(e) => return Err(e.into()),
    }

    let operation = verify_and_decode(crc, &payload)?;
    Ok(Frame::Entry(operation, ENTRY_HEADER_SIZE + len as u64))
}

/// Read a frame that is known to exist (random access after replay)
pub(super) fn read_known_frame<R: Read>(r: &mut R) -> Result<Operation> {
    let mut header = [0u8; ENTRY_HEADER_SIZE as usize];
    r.read_exact(&mut header)?;
    let (crc, len) = parse_header(&header)?;

    let mut payload = vec![0u8; len as usize];
    r.read_exact(&mut payload)?;
    verify_and_decode(crc, &payload)
}

fn parse_header(header: &[u8; ENTRY_HEADER_SIZE as usize]) -> Result<(u32, u32)> {
    let crc = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if len > MAX_ENTRY_SIZE {
        return Err(AssortError::Corruption(format!(
            "Entry length {} exceeds limit",
            len
        )));
    }
    Ok((crc, len))
}

fn verify_and_decode(crc: u32, payload: &[u8]) -> Result<Operation> {
    let actual = crc32fast::hash(payload);
    if actual != crc {
        return Err(AssortError::Corruption(format!(
            "Entry checksum mismatch: stored {:#010x}, computed {:#010x}",
            crc, actual
        )));
    }
    Ok(bincode::deserialize(payload)?)
}
