//! Snapshot encoding and decoding
//!
//! A snapshot is one file holding the full logical state of a store as an
//! ordered quadruple: field schema, next-identifier counter, record map,
//! index map. Layout:
//!
//! ```text
//! +--------------------------------------------------+
//! | Header (one JSON line)                           |
//! |   format_version, created_at, checksum           |
//! +--------------------------------------------------+
//! | Body (JSON): schema, next_id, records, indices   |
//! +--------------------------------------------------+
//! ```
//!
//! The checksum is a CRC32 over the body bytes. The write is a plain
//! create-write-fsync; it is not atomic at the storage layer, and a
//! half-written file is detected at open time by the checksum, never
//! repaired.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::checksum::{compute_checksum, format_checksum, parse_checksum};
use super::errors::{SnapshotError, SnapshotResult};
use crate::index::PortableIndexMap;
use crate::store::record::{Record, RecordId};
use crate::store::schema::Schema;

/// The snapshot format version this build writes and understands.
pub const FORMAT_VERSION: u8 = 1;

/// One-line snapshot descriptor preceding the body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct SnapshotHeader {
    /// Snapshot format version
    format_version: u8,
    /// Creation timestamp, RFC3339 (YYYY-MM-DDTHH:MM:SSZ)
    created_at: String,
    /// CRC32 of the body bytes, `crc32:XXXXXXXX`
    checksum: String,
}

/// The persisted quadruple.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotBody {
    /// Field schema with defaults
    pub schema: Schema,
    /// Next identifier to allocate
    pub next_id: RecordId,
    /// Every live record
    pub records: Vec<Record>,
    /// Index map: field -> (value, ascending ids) pairs
    pub indices: PortableIndexMap,
}

/// Serialize the quadruple to `path` with an fsync.
pub fn write_snapshot(path: &Path, body: &SnapshotBody, format_version: u8) -> SnapshotResult<()> {
    let body_bytes = serde_json::to_vec(body)
        .map_err(|e| SnapshotError::Io(format!("encode snapshot body: {}", e)))?;

    let header = SnapshotHeader {
        format_version,
        created_at: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        checksum: format_checksum(compute_checksum(&body_bytes)),
    };
    let header_line = serde_json::to_string(&header)
        .map_err(|e| SnapshotError::Io(format!("encode snapshot header: {}", e)))?;

    let mut file = File::create(path).map_err(|e| SnapshotError::io_at(path, e))?;
    file.write_all(header_line.as_bytes())
        .and_then(|_| file.write_all(b"\n"))
        .and_then(|_| file.write_all(&body_bytes))
        .map_err(|e| SnapshotError::io_at(path, e))?;
    file.sync_all().map_err(|e| SnapshotError::io_at(path, e))?;

    Ok(())
}

/// Read and verify a snapshot file.
///
/// Fails with `Corrupt` when the header or body does not decode, the
/// format version is unknown, or the checksum does not match.
pub fn read_snapshot(path: &Path) -> SnapshotResult<SnapshotBody> {
    let bytes = std::fs::read(path).map_err(|e| SnapshotError::io_at(path, e))?;

    let newline = bytes
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| SnapshotError::Corrupt("missing header line".to_string()))?;
    let (header_bytes, rest) = bytes.split_at(newline);
    let body_bytes = &rest[1..];

    let header: SnapshotHeader = serde_json::from_slice(header_bytes)
        .map_err(|e| SnapshotError::Corrupt(format!("bad header: {}", e)))?;

    if header.format_version != FORMAT_VERSION {
        return Err(SnapshotError::Corrupt(format!(
            "unsupported format version {}",
            header.format_version
        )));
    }

    let recorded = parse_checksum(&header.checksum)
        .ok_or_else(|| SnapshotError::Corrupt(format!("malformed checksum {}", header.checksum)))?;
    let actual = compute_checksum(body_bytes);
    if recorded != actual {
        return Err(SnapshotError::Corrupt(format!(
            "checksum mismatch: header {} body {}",
            header.checksum,
            format_checksum(actual)
        )));
    }

    serde_json::from_slice(body_bytes)
        .map_err(|e| SnapshotError::Corrupt(format!("bad body: {}", e)))
}
