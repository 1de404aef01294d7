//! Repository Module
//!
//! The catalog and track CRUD and search API.
//!
//! Every operation comes in two flavours:
//! - `try_*` returns a `Result` so callers can see which failure happened
//! - the plain form is fail-soft: an empty record or `false` on any failure,
//!   with the error logged at debug level
//!
//! A "not found" record is one whose `catalog` field is empty
//! (see [`FixedRecord::is_empty`]).

use crate::config::Config;
use crate::error::{Result, VaultError};
use crate::key::{catalog_key, track_key, validate_catalog_id};
use crate::record::{CatalogRecord, FixedRecord, TrackRecord, CAT_CAT_LEN};
use crate::store::{Cursor, Store, TableId};

/// Record totals of both tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryCounts {
    pub catalogs: usize,
    pub tracks: usize,
}

/// State of one resumable catalog search
///
/// A new search has not started yet, so continuing it starts from the
/// beginning of the table.
#[derive(Debug, Clone)]
pub struct CatalogSearch {
    cursor: Cursor,
}

impl CatalogSearch {
    pub fn new() -> Self {
        Self {
            cursor: Cursor::new(TableId::Catalog),
        }
    }

    /// Forget progress; the next call starts over
    pub fn restart(&mut self) {
        self.cursor = Cursor::new(TableId::Catalog);
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_exhausted()
    }
}

impl Default for CatalogSearch {
    fn default() -> Self {
        Self::new()
    }
}

/// CRUD and search over a [`Store`]
pub struct Repository {
    store: Store,
}

impl Repository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Open a store for `config` and wrap it
    pub fn open(config: Config, fresh: bool) -> Result<Self> {
        Ok(Self::new(Store::open(config, fresh)?))
    }

    /// Re-open the underlying store; see [`Store::initialize`]
    pub fn initialize(&self, fresh: bool) -> bool {
        collapse("initialize", self.store.initialize(fresh)).is_some()
    }

    pub fn close(&self) {
        self.store.close();
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // =========================================================================
    // Catalog Entries
    // =========================================================================

    /// Look up a catalog entry; `Ok(None)` when absent
    pub fn try_get_catalog_entry(&self, catalog_id: &str) -> Result<Option<CatalogRecord>> {
        self.store.ensure_open()?;
        let key = catalog_key(catalog_id)?;

        self.store
            .get(TableId::Catalog, key.as_bytes())?
            .map(|bytes| CatalogRecord::decode(&bytes))
            .transpose()
    }

    /// Fail-soft lookup: an empty record when absent or on error
    pub fn get_catalog_entry(&self, catalog_id: &str) -> CatalogRecord {
        collapse("get_catalog_entry", self.try_get_catalog_entry(catalog_id))
            .flatten()
            .unwrap_or_default()
    }

    /// Insert or replace a catalog entry
    pub fn try_add_catalog_entry(&self, record: &CatalogRecord) -> Result<()> {
        self.store.ensure_open()?;
        let key = catalog_key(&record.catalog)?;
        let value = record.encode()?;

        self.store.put(TableId::Catalog, key.as_bytes(), &value)?;
        tracing::debug!("Stored catalog entry {}", key);
        Ok(())
    }

    pub fn add_catalog_entry(&self, record: &CatalogRecord) -> bool {
        collapse("add_catalog_entry", self.try_add_catalog_entry(record)).is_some()
    }

    /// Delete a catalog entry. Its tracks are left in place.
    pub fn try_delete_catalog_entry(&self, catalog_id: &str) -> Result<()> {
        self.store.ensure_open()?;
        let key = catalog_key(catalog_id)?;

        self.store.delete(TableId::Catalog, key.as_bytes())?;
        tracing::debug!("Deleted catalog entry {}", key);
        Ok(())
    }

    pub fn delete_catalog_entry(&self, catalog_id: &str) -> bool {
        collapse("delete_catalog_entry", self.try_delete_catalog_entry(catalog_id)).is_some()
    }

    // =========================================================================
    // Track Entries
    // =========================================================================

    /// Look up a track entry; `Ok(None)` when absent
    pub fn try_get_track_entry(&self, catalog_id: &str, track_no: u32) -> Result<Option<TrackRecord>> {
        self.store.ensure_open()?;
        let key = track_key(catalog_id, track_no)?;

        self.store
            .get(TableId::Track, key.as_bytes())?
            .map(|bytes| TrackRecord::decode(&bytes))
            .transpose()
    }

    pub fn get_track_entry(&self, catalog_id: &str, track_no: u32) -> TrackRecord {
        collapse("get_track_entry", self.try_get_track_entry(catalog_id, track_no))
            .flatten()
            .unwrap_or_default()
    }

    /// Insert or replace a track entry
    pub fn try_add_track_entry(&self, record: &TrackRecord) -> Result<()> {
        self.store.ensure_open()?;
        let key = track_key(&record.catalog, record.track_no)?;
        let value = record.encode()?;

        self.store.put(TableId::Track, key.as_bytes(), &value)?;
        tracing::debug!("Stored track entry {}", key);
        Ok(())
    }

    pub fn add_track_entry(&self, record: &TrackRecord) -> bool {
        collapse("add_track_entry", self.try_add_track_entry(record)).is_some()
    }

    pub fn try_delete_track_entry(&self, catalog_id: &str, track_no: u32) -> Result<()> {
        self.store.ensure_open()?;
        let key = track_key(catalog_id, track_no)?;

        self.store.delete(TableId::Track, key.as_bytes())?;
        tracing::debug!("Deleted track entry {}", key);
        Ok(())
    }

    pub fn delete_track_entry(&self, catalog_id: &str, track_no: u32) -> bool {
        collapse(
            "delete_track_entry",
            self.try_delete_track_entry(catalog_id, track_no),
        )
        .is_some()
    }

    /// Tracks numbered 1, 2, 3, ... up to the first missing number
    pub fn try_tracks(&self, catalog_id: &str) -> Result<Vec<TrackRecord>> {
        let mut tracks = Vec::new();
        for track_no in 1.. {
            match self.try_get_track_entry(catalog_id, track_no)? {
                Some(track) => tracks.push(track),
                None => break,
            }
        }
        Ok(tracks)
    }

    pub fn tracks(&self, catalog_id: &str) -> Vec<TrackRecord> {
        collapse("tracks", self.try_tracks(catalog_id)).unwrap_or_default()
    }

    /// Delete tracks 1, 2, 3, ... up to the first missing number
    ///
    /// Returns how many were removed.
    pub fn try_delete_tracks(&self, catalog_id: &str) -> Result<usize> {
        let mut removed = 0;
        for track_no in 1.. {
            match self.try_delete_track_entry(catalog_id, track_no) {
                Ok(()) => removed += 1,
                Err(VaultError::KeyNotFound) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(removed)
    }

    // =========================================================================
    // Search and Counts
    // =========================================================================

    /// Next catalog entry whose identifier contains `needle`
    ///
    /// Continues from wherever `search` stopped. `Ok(None)` once the table is
    /// exhausted; further calls keep returning `Ok(None)` until the search is
    /// restarted.
    pub fn try_search_catalog(
        &self,
        needle: &str,
        search: &mut CatalogSearch,
    ) -> Result<Option<CatalogRecord>> {
        self.store.ensure_open()?;
        if needle.len() >= CAT_CAT_LEN {
            return Err(VaultError::KeyTooLong {
                len: needle.len(),
                max: CAT_CAT_LEN - 1,
            });
        }

        while let Some(entry) = self.store.next(&mut search.cursor)? {
            let record = CatalogRecord::decode(&entry.value)?;
            if record.catalog.contains(needle) {
                return Ok(Some(record));
            }
        }

        Ok(None)
    }

    /// Fail-soft search
    ///
    /// When `*start` is set the search restarts from the beginning of the
    /// table and `*start` is cleared; otherwise it continues. An empty record
    /// means no further match.
    pub fn search_catalog(
        &self,
        needle: &str,
        search: &mut CatalogSearch,
        start: &mut bool,
    ) -> CatalogRecord {
        if *start {
            search.restart();
            *start = false;
        }

        collapse("search_catalog", self.try_search_catalog(needle, search))
            .flatten()
            .unwrap_or_default()
    }

    /// Record totals of both tables
    pub fn try_count_entries(&self) -> Result<EntryCounts> {
        Ok(EntryCounts {
            catalogs: self.store.len(TableId::Catalog)?,
            tracks: self.store.len(TableId::Track)?,
        })
    }

    pub fn count_entries(&self) -> EntryCounts {
        collapse("count_entries", self.try_count_entries()).unwrap_or_default()
    }

    /// Check a catalog identifier without touching the store
    pub fn is_valid_catalog_id(catalog_id: &str) -> bool {
        validate_catalog_id(catalog_id).is_ok()
    }
}

/// Turn an error into `None`, logging it
fn collapse<T>(operation: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("{} failed: {}", operation, e);
            None
        }
    }
}
