//! Track record
//!
//! Per-track metadata, keyed by `"<catalog> <track_no>"`.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::Result;

use super::{check_size, get_text, put_text, FixedRecord, CAT_CAT_LEN, TRACK_TTEXT_LEN};

/// One track of a CD
///
/// `catalog` refers to the owning [`CatalogRecord`](super::CatalogRecord) by
/// value only; the two tables are independent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackRecord {
    pub catalog: String,
    pub track_no: u32,
    /// Free-form track description (title, duration, ...)
    pub text: String,
}

impl TrackRecord {
    pub fn new(catalog: impl Into<String>, track_no: u32, text: impl Into<String>) -> Self {
        Self {
            catalog: catalog.into(),
            track_no,
            text: text.into(),
        }
    }
}

impl FixedRecord for TrackRecord {
    const ENCODED_SIZE: usize = (CAT_CAT_LEN + 1) + 4 + (TRACK_TTEXT_LEN + 1);

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(Self::ENCODED_SIZE);
        put_text(&mut buf, "catalog", &self.catalog, CAT_CAT_LEN)?;
        buf.put_u32_le(self.track_no);
        put_text(&mut buf, "track text", &self.text, TRACK_TTEXT_LEN)?;
        Ok(buf.to_vec())
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        check_size("track", bytes, Self::ENCODED_SIZE)?;

        let mut buf = bytes;
        let catalog = get_text(&mut buf, "catalog", CAT_CAT_LEN)?;
        let track_no = buf.get_u32_le();
        let text = get_text(&mut buf, "track text", TRACK_TTEXT_LEN)?;

        Ok(Self {
            catalog,
            track_no,
            text,
        })
    }

    fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }
}
