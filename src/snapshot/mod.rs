//! Full-snapshot persistence
//!
//! `commit` writes the whole store state in one shot; `open` reads it back
//! and verifies integrity. There is no write-ahead log and no partial-write
//! recovery: the last successfully written snapshot wins.

pub mod checksum;
mod codec;
mod errors;

pub use codec::{read_snapshot, write_snapshot, SnapshotBody, FORMAT_VERSION};
pub use errors::{SnapshotError, SnapshotResult};
