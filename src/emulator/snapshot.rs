//! Table snapshots
//!
//! ## File Format
//! ```text
//! ┌───────────┬─────────────┬─────────┬─────────┬──────────────────┐
//! │ Magic (4) │ Version (2) │ CRC (4) │ Len (4) │ bincode payload  │
//! └───────────┴─────────────┴─────────┴─────────┴──────────────────┘
//! ```
//! Integers are little-endian. The CRC covers the payload only. A snapshot is
//! written to a sibling temp file and renamed over the old one.

use std::fs;
use std::path::Path;

use crate::error::{KvError, Result};

use super::table::Namespaces;

pub const MAGIC: &[u8; 4] = b"EKVS";
pub const VERSION: u16 = 1;
pub const HEADER_SIZE: usize = 14;

/// Write a snapshot of `namespaces` to `path`
pub(super) fn save(path: &Path, namespaces: &Namespaces) -> Result<()> {
    let payload =
        bincode::serialize(namespaces).map_err(|e| KvError::Serialization(e.to_string()))?;

    let mut file = Vec::with_capacity(HEADER_SIZE + payload.len());
    file.extend_from_slice(MAGIC);
    file.extend_from_slice(&VERSION.to_le_bytes());
    file.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    file.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    file.extend_from_slice(&payload);

    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, &file)?;
    fs::rename(&tmp_path, path)?;

    tracing::trace!("Snapshot of {} bytes written to {}", file.len(), path.display());
    Ok(())
}

/// Read and verify a snapshot
pub(super) fn load(path: &Path) -> Result<Namespaces> {
    let file = fs::read(path)?;

    if file.len() < HEADER_SIZE {
        return Err(KvError::SnapshotCorruption(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            file.len()
        )));
    }

    if &file[0..4] != MAGIC {
        return Err(KvError::SnapshotCorruption("Bad magic".to_string()));
    }

    let version = u16::from_le_bytes([file[4], file[5]]);
    if version != VERSION {
        return Err(KvError::SnapshotCorruption(format!(
            "Unsupported version {}",
            version
        )));
    }

    let crc = u32::from_le_bytes([file[6], file[7], file[8], file[9]]);
    let len = u32::from_le_bytes([file[10], file[11], file[12], file[13]]) as usize;

    let payload = &file[HEADER_SIZE..];
    if payload.len() != len {
        return Err(KvError::SnapshotCorruption(format!(
            "Payload length mismatch: header says {}, file has {}",
            len,
            payload.len()
        )));
    }

    if crc32fast::hash(payload) != crc {
        return Err(KvError::SnapshotCorruption("CRC mismatch".to_string()));
    }

    bincode::deserialize(payload).map_err(|e| KvError::Serialization(e.to_string()))
}
