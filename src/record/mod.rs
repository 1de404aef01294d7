//! Record Module
//!
//! Fixed-layout records stored in the catalog and track tables.
//!
//! ## Layout
//! Every text field occupies a null-padded slot one byte wider than its
//! maximum length. Integers are little-endian.
//!
//! ```text
//! CatalogRecord (204 bytes)
//! ┌──────────────┬─────────────┬────────────┬──────────────┐
//! │ catalog (31) │ title (71)  │ kind (31)  │ artist (71)  │
//! └──────────────┴─────────────┴────────────┴──────────────┘
//!
//! TrackRecord (106 bytes)
//! ┌──────────────┬───────────────┬─────────────┐
//! │ catalog (31) │ track_no (4)  │ text (71)   │
//! └──────────────┴───────────────┴─────────────┘
//! ```

mod catalog;
mod track;

pub use catalog::CatalogRecord;
pub use track::TrackRecord;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, VaultError};

// =============================================================================
// Field Limits
// =============================================================================

/// Width of a catalog identifier slot; identifiers must be strictly shorter
pub const CAT_CAT_LEN: usize = 30;

/// Maximum disc title length
pub const CAT_TITLE_LEN: usize = 70;

/// Maximum disc type (genre, format) length
pub const CAT_TYPE_LEN: usize = 30;

/// Maximum artist length
pub const CAT_ARTIST_LEN: usize = 70;

/// Maximum track text length
pub const TRACK_TTEXT_LEN: usize = 70;

/// A record with a fixed encoded size
pub trait FixedRecord: Sized {
    /// Exact size of the encoded form in bytes
    const ENCODED_SIZE: usize;

    /// Serialize into exactly `ENCODED_SIZE` bytes
    fn encode(&self) -> Result<Vec<u8>>;

    /// Deserialize from exactly `ENCODED_SIZE` bytes
    fn decode(bytes: &[u8]) -> Result<Self>;

    /// True when the identifying field is empty (the "not found" record)
    fn is_empty(&self) -> bool;
}

// =============================================================================
// Field Helpers
// =============================================================================

pub(crate) fn put_text(buf: &mut BytesMut, field: &str, value: &str, max_len: usize) -> Result<()> {
    if value.len() > max_len {
        return Err(VaultError::InvalidArgument(format!(
            "{} is {} bytes (max {})",
            field,
            value.len(),
            max_len
        )));
    }
    if value.as_bytes().contains(&0) {
        return Err(VaultError::InvalidArgument(format!(
            "{} contains a NUL byte",
            field
        )));
    }

    buf.put_slice(value.as_bytes());
    buf.put_bytes(0, max_len + 1 - value.len());
    Ok(())
}

pub(crate) fn get_text(buf: &mut &[u8], field: &str, max_len: usize) -> Result<String> {
    let width = max_len + 1;
    let raw = &buf[..width];

    let end = raw.iter().position(|&b| b == 0).ok_or_else(|| {
        VaultError::Corruption(format!("{} is not NUL-terminated", field))
    })?;
    let text = std::str::from_utf8(&raw[..end])
        .map_err(|e| VaultError::Corruption(format!("{} is not UTF-8: {}", field, e)))?
        .to_owned();

    buf.advance(width);
    Ok(text)
}

pub(crate) fn check_size(kind: &str, bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() != expected {
        return Err(VaultError::Corruption(format!(
            "{} record is {} bytes, expected {}",
            kind,
            bytes.len(),
            expected
        )));
    }
    Ok(())
}
