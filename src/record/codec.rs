//! Record codec
//!
//! Encoding and decoding of records to their on-backend byte form.

use crate::error::{CellarError, Result};

use super::Record;

/// Magic bytes at the start of every record
pub const MAGIC: &[u8; 4] = b"CLRC";

/// Current record format version
pub const VERSION: u16 = 1;

/// Header size: magic (4) + version (2) + crc (4)
pub const HEADER_SIZE: usize = 10;

/// Encode a record to bytes
///
/// Format: magic (4) + version (2) + crc32 of payload (4) + bincode payload
pub fn encode_record(record: &Record) -> Result<Vec<u8>> {
    let payload = bincode::serialize(record)
        .map_err(|e| CellarError::Decode(format!("Failed to encode record {}: {}", record.id, e)))?;

    let crc = crc32fast::hash(&payload);

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&VERSION.to_le_bytes());
    bytes.extend_from_slice(&crc.to_le_bytes());
    bytes.extend_from_slice(&payload);

    Ok(bytes)
}

/// Decode a record from bytes
///
/// Fails with `Decode` on a short buffer, wrong magic, unknown version,
/// checksum mismatch, or a payload that does not deserialize.
pub fn decode_record(bytes: &[u8]) -> Result<Record> {
    if bytes.len() < HEADER_SIZE {
        return Err(CellarError::Decode(format!(
            "Record too short: {} bytes, need at least {}",
            bytes.len(),
            HEADER_SIZE
        )));
    }

    if &bytes[0..4] != MAGIC {
        return Err(CellarError::Decode("Invalid record magic".to_string()));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(CellarError::Decode(format!(
            "Unsupported record version: {}",
            version
        )));
    }

    let stored_crc = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
    let payload = &bytes[HEADER_SIZE..];
    let computed_crc = crc32fast::hash(payload);
    if stored_crc != computed_crc {
        return Err(CellarError::Decode(format!(
            "Record checksum mismatch: stored {:#010x}, computed {:#010x}",
            stored_crc, computed_crc
        )));
    }

    bincode::deserialize(payload)
        .map_err(|e| CellarError::Decode(format!("Invalid record payload: {}", e)))
}
