//! Record Module
//!
//! The unit of persisted data: one record per live key.
//!
//! ## Responsibilities
//! - Carry the opaque id, the logical key, the value and the cacheable flag
//! - Encode/decode records with a checksum so torn or corrupt files are detected
//!
//! ## File Format
//! ```text
//! ┌──────────┬─────────────┬─────────┬──────────────────────────┐
//! │Magic (4) │ Version (2) │ CRC (4) │ Payload (bincode Record) │
//! └──────────┴─────────────┴─────────┴──────────────────────────┘
//! ```

mod codec;

pub use codec::{decode_record, encode_record, HEADER_SIZE, MAGIC, VERSION};

use serde::{Deserialize, Serialize};

/// A single persisted key-value pair
///
/// `id` is the physical identity of the record. It is generated when a key is
/// first inserted and reused on every later update of that key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Opaque, collision-free identifier (names the file/object)
    pub id: String,

    /// Logical key supplied by the caller
    pub key: String,

    /// Value bytes (never empty)
    pub value: Vec<u8>,

    /// Whether the value is mirrored in the collection's memory cache
    pub cacheable: bool,
}

impl Record {
    pub fn new(
        id: impl Into<String>,
        key: impl Into<String>,
        value: Vec<u8>,
        cacheable: bool,
    ) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            value,
            cacheable,
        }
    }
}
