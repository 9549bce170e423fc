//! CRC32 integrity checks for snapshot files
//!
//! The header records a CRC32 (IEEE polynomial, via crc32fast) of the body
//! bytes in the form `crc32:XXXXXXXX`; `open` refuses a snapshot whose body
//! does not hash to the recorded value.

use crc32fast::Hasher;

/// Computes a CRC32 checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Formats a checksum as `crc32:XXXXXXXX` (lowercase hex, zero-padded).
pub fn format_checksum(checksum: u32) -> String {
    format!("crc32:{:08x}", checksum)
}

/// Parses a formatted checksum back to u32. `None` on invalid format.
pub fn parse_checksum(formatted: &str) -> Option<u32> {
    let stripped = formatted.strip_prefix("crc32:")?;
    u32::from_str_radix(stripped, 16).ok()
}
