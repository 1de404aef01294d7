//! Key Builder
//!
//! Derives the fixed-width table keys for catalog and track records.
//!
//! ```text
//! catalog key: "<catalog>" NUL-padded to CAT_CAT_LEN bytes
//! track key:   "<catalog> <track_no>" NUL-padded to CAT_CAT_LEN + 10 bytes
//! ```
//!
//! A key always ends in at least one NUL byte. Text that would not leave room
//! for it is rejected with `KeyTooLong` rather than truncated.

use std::fmt;

use crate::error::{Result, VaultError};
use crate::record::CAT_CAT_LEN;

/// Width of a catalog table key
pub const CATALOG_KEY_SIZE: usize = CAT_CAT_LEN;

/// Width of a track table key
pub const TRACK_KEY_SIZE: usize = CAT_CAT_LEN + 10;

/// A fixed-width, NUL-padded table key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey(Vec<u8>);

impl RecordKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The key text before the padding
    pub fn text(&self) -> String {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(self.0.len());
        String::from_utf8_lossy(&self.0[..end]).into_owned()
    }

    fn padded(text: &str, width: usize) -> Result<Self> {
        if text.len() >= width {
            return Err(VaultError::KeyTooLong {
                len: text.len(),
                max: width - 1,
            });
        }

        let mut buf = vec![0u8; width];
        buf[..text.len()].copy_from_slice(text.as_bytes());
        Ok(Self(buf))
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl AsRef<[u8]> for RecordKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Check a catalog identifier against the key capacity
pub fn validate_catalog_id(catalog_id: &str) -> Result<()> {
    if catalog_id.is_empty() {
        return Err(VaultError::InvalidArgument(
            "catalog identifier is empty".to_string(),
        ));
    }
    if catalog_id.as_bytes().contains(&0) {
        return Err(VaultError::InvalidArgument(
            "catalog identifier contains a NUL byte".to_string(),
        ));
    }
    if catalog_id.len() >= CAT_CAT_LEN {
        return Err(VaultError::KeyTooLong {
            len: catalog_id.len(),
            max: CAT_CAT_LEN - 1,
        });
    }
    Ok(())
}

/// Build the catalog table key for `catalog_id`
pub fn catalog_key(catalog_id: &str) -> Result<RecordKey> {
    validate_catalog_id(catalog_id)?;
    RecordKey::padded(catalog_id, CATALOG_KEY_SIZE)
}

/// Build the track table key `"<catalog_id> <track_no>"`
pub fn track_key(catalog_id: &str, track_no: u32) -> Result<RecordKey> {
    validate_catalog_id(catalog_id)?;
    RecordKey::padded(&format!("{} {}", catalog_id, track_no), TRACK_KEY_SIZE)
}
