//! Segment file layout:
//!
//! ```text
//! [0, 8)    magic (u64 LE, "SANDSST1")
//! [8, EOF)  records, ascending by encoded key:
//!           uvarint(key_len) | uvarint(value_len) | key | type_tag | value
//! ```
//!
//! `value_len` counts the type tag. There is no index and no footer.

pub const MAGIC: u64 = u64::from_le_bytes(*b"SANDSST1");
pub const HEADER_SIZE: u64 = 8;

/// Type tag of a deletion marker.
pub const TYPE_NIL: u8 = 0;
/// Type tag of a stored value. Any tag other than [`TYPE_NIL`] reads as present.
pub const TYPE_BYTES: u8 = 1;

pub mod reader;
#[cfg(test)]
pub(crate) mod writer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Present(Vec<u8>),
    Tombstone,
}

impl Value {
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Value::Tombstone)
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Present(v) => Some(v),
            Value::Tombstone => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Value::Present(v) => Some(v),
            Value::Tombstone => None,
        }
    }
}

/// The newest record stored for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub value: Value,
    pub ts: i64,
}
