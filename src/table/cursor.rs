//! Table Cursor
//!
//! Position of a full-table scan: a bucket and an offset within its chain.
//! Positions are counted rather than stored as slot indexes, so a slot freed
//! mid-scan never leaves the cursor pointing at a recycled slot.

/// Resumable scan position over a [`HashTable`](super::HashTable)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCursor {
    /// Bucket currently being walked
    pub(crate) bucket: u32,
    /// Number of chain entries of `bucket` already returned
    pub(crate) position: u32,
    /// Set once every bucket has been walked
    pub(crate) exhausted: bool,
}

impl TableCursor {
    /// A cursor at the start of the table
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
