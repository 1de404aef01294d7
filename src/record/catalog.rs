//! Catalog record
//!
//! Disc-level metadata, keyed by the catalog identifier.

use bytes::BytesMut;

use crate::error::Result;

use super::{
    check_size, get_text, put_text, FixedRecord, CAT_ARTIST_LEN, CAT_CAT_LEN, CAT_TITLE_LEN,
    CAT_TYPE_LEN,
};

/// One CD in the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogRecord {
    /// Unique identifier, used verbatim as the table key
    pub catalog: String,
    pub title: String,
    /// Genre or media type
    pub kind: String,
    pub artist: String,
}

impl CatalogRecord {
    pub fn new(
        catalog: impl Into<String>,
        title: impl Into<String>,
        kind: impl Into<String>,
        artist: impl Into<String>,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            title: title.into(),
            kind: kind.into(),
            artist: artist.into(),
        }
    }
}

impl FixedRecord for CatalogRecord {
    const ENCODED_SIZE: usize =
        (CAT_CAT_LEN + 1) + (CAT_TITLE_LEN + 1) + (CAT_TYPE_LEN + 1) + (CAT_ARTIST_LEN + 1);

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(Self::ENCODED_SIZE);
        put_text(&mut buf, "catalog", &self.catalog, CAT_CAT_LEN)?;
        put_text(&mut buf, "title", &self.title, CAT_TITLE_LEN)?;
        put_text(&mut buf, "type", &self.kind, CAT_TYPE_LEN)?;
        put_text(&mut buf, "artist", &self.artist, CAT_ARTIST_LEN)?;
        Ok(buf.to_vec())
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        check_size("catalog", bytes, Self::ENCODED_SIZE)?;

        let mut buf = bytes;
        Ok(Self {
            catalog: get_text(&mut buf, "catalog", CAT_CAT_LEN)?,
            title: get_text(&mut buf, "title", CAT_TITLE_LEN)?,
            kind: get_text(&mut buf, "type", CAT_TYPE_LEN)?,
            artist: get_text(&mut buf, "artist", CAT_ARTIST_LEN)?,
        })
    }

    fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }
}
