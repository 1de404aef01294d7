//! Table Module
//!
//! A persistent hashed table of fixed-size records, split across two files
//! the way classic dbm does it: a directory file with the bucket heads and a
//! page file with the record slots.
//!
//! ## Directory File (`<base>.dir`)
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ Header (18 bytes)                                                │
//! │   Magic "CDDR" (4) | Version u16 | KeySize u32 | ValueSize u32   │
//! │   | BucketCount u32                                              │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Bucket heads: BucketCount x u64 (slot index, u64::MAX = empty)   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Page File (`<base>.pag`)
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ Header (18 bytes), magic "CDPG", other fields as above           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Slot 0: [State u8][Next u64][Key][Value][CRC32 u32]              │
//! │ Slot 1: ...                                                      │
//! │   (State 0 = free, 1 = live; CRC covers all preceding bytes)     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each bucket is a singly linked chain of slots threaded through `Next`.
//! Freed slots are reused before the page file grows.

mod cursor;
mod hash_table;
mod header;
mod slot;

pub use cursor::TableCursor;
pub use hash_table::HashTable;
pub use header::TableHeader;

// =============================================================================
// Shared Constants
// =============================================================================

/// Magic bytes of a directory file
pub(crate) const DIR_MAGIC: &[u8; 4] = b"CDDR";

/// Magic bytes of a page file
pub(crate) const PAG_MAGIC: &[u8; 4] = b"CDPG";

/// Current table format version
pub(crate) const FORMAT_VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + KeySize (4) + ValueSize (4) + BucketCount (4)
pub const HEADER_SIZE: u64 = 18;

/// Sentinel for "no slot" in bucket heads and chain links
pub(crate) const NO_SLOT: u64 = u64::MAX;

/// Sizes of the keys and values a table stores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    pub key_size: usize,
    pub value_size: usize,
}

impl TableLayout {
    pub fn new(key_size: usize, value_size: usize) -> Self {
        Self {
            key_size,
            value_size,
        }
    }

    /// Size of one page file slot
    pub fn slot_size(&self) -> usize {
        slot::SLOT_OVERHEAD + self.key_size + self.value_size
    }
}

/// A key and its value as read from a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}
