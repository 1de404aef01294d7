//! Store Module
//!
//! The storage engine that owns the catalog and track tables.
//!
//! ## Responsibilities
//! - Open, create-fresh and close both tables as one unit
//! - Route point lookups, upserts and deletes to the right table
//! - Drive caller-owned scan cursors
//!
//! The store is either fully open (both tables) or fully closed. Every
//! operation on a closed store fails with `NotOpen`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{Result, VaultError};
use crate::key::{CATALOG_KEY_SIZE, TRACK_KEY_SIZE};
use crate::record::{CatalogRecord, FixedRecord, TrackRecord};
use crate::table::{HashTable, TableCursor, TableEntry, TableLayout};

/// Which of the two tables an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableId {
    Catalog,
    Track,
}

impl TableId {
    /// File base name of the table inside the data directory
    pub fn base_name(&self) -> &'static str {
        match self {
            TableId::Catalog => "cdc_data",
            TableId::Track => "cdt_data",
        }
    }

    /// Key and value sizes of the table
    pub fn layout(&self) -> TableLayout {
        match self {
            TableId::Catalog => TableLayout::new(CATALOG_KEY_SIZE, CatalogRecord::ENCODED_SIZE),
            TableId::Track => TableLayout::new(TRACK_KEY_SIZE, TrackRecord::ENCODED_SIZE),
        }
    }
}

/// Caller-owned scan position over one table
///
/// Independent cursors never interfere. A cursor is tied to the session it
/// was started in: once the store is closed or re-initialized it reports
/// exhaustion.
#[derive(Debug, Clone)]
pub struct Cursor {
    table: TableId,
    /// `None` until the first `first()` call
    state: Option<(u64, TableCursor)>,
}

impl Cursor {
    pub fn new(table: TableId) -> Self {
        Self { table, state: None }
    }

    pub fn table(&self) -> TableId {
        self.table
    }

    /// True before the first `first()` call
    pub fn is_unstarted(&self) -> bool {
        self.state.is_none()
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, Some((_, position)) if position.is_exhausted())
    }
}

/// Both tables of an open store
struct OpenTables {
    catalog: HashTable,
    track: HashTable,
    /// Incremented on every successful initialize
    session: u64,
}

impl OpenTables {
    fn table_mut(&mut self, table: TableId) -> &mut HashTable {
        match table {
            TableId::Catalog => &mut self.catalog,
            TableId::Track => &mut self.track,
        }
    }
}

/// The catalog storage engine
///
/// ## Concurrency Model
/// Synchronous and blocking. The open tables sit behind one Mutex so every
/// method takes `&self`; operations are serialized, never concurrent. Two
/// stores must not share a data directory: files are not locked.
pub struct Store {
    config: Config,
    tables: Mutex<Option<OpenTables>>,
    /// Session counter carried across close/initialize
    sessions: AtomicU64,
}

impl Store {
    /// Create a closed store for `config`; call `initialize` before use
    pub fn new(config: Config) -> Self {
        Self {
            config,
            tables: Mutex::new(None),
            sessions: AtomicU64::new(0),
        }
    }

    /// Create and initialize a store
    pub fn open(config: Config, fresh: bool) -> Result<Self> {
        let store = Self::new(config);
        store.initialize(fresh)?;
        Ok(store)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path, fresh: bool) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config, fresh)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Open both tables
    ///
    /// Steps:
    /// 1. Close any open tables
    /// 2. If `fresh`, remove existing table files
    /// 3. Open (creating if absent) both tables
    ///
    /// On failure the store is left closed.
    pub fn initialize(&self, fresh: bool) -> Result<()> {
        let mut guard = self.tables.lock();

        // Step 1: Close whatever is open
        if let Some(mut open) = guard.take() {
            Self::sync_tables(&mut open);
        }

        // Step 2: Discard old files
        fs::create_dir_all(&self.config.data_dir)?;
        if fresh {
            for table in [TableId::Catalog, TableId::Track] {
                HashTable::remove_files(&self.table_base(table))?;
            }
            tracing::info!("Removed existing tables in {}", self.config.data_dir.display());
        }

        // Step 3: Open both or neither
        let catalog = self.open_table(TableId::Catalog)?;
        let track = self.open_table(TableId::Track)?;

        let session = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;

        tracing::info!(
            "Store open in {} (session {}): {} catalog, {} track records",
            self.config.data_dir.display(),
            session,
            catalog.len(),
            track.len()
        );

        *guard = Some(OpenTables {
            catalog,
            track,
            session,
        });
        Ok(())
    }

    /// Sync and close both tables; closing a closed store is a no-op
    pub fn close(&self) {
        if let Some(mut open) = self.tables.lock().take() {
            Self::sync_tables(&mut open);
            tracing::info!("Store closed (session {})", open.session);
        }
    }

    pub fn is_open(&self) -> bool {
        self.tables.lock().is_some()
    }

    /// `Ok(())` if open, `NotOpen` otherwise
    pub fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(VaultError::NotOpen)
        }
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Point lookup; a missing key is `Ok(None)`
    pub fn get(&self, table: TableId, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.with_table(table, |t| t.get(key))
    }

    /// Insert or replace
    pub fn put(&self, table: TableId, key: &[u8], value: &[u8]) -> Result<()> {
        self.with_table(table, |t| t.put(key, value))
    }

    /// Remove a key; `KeyNotFound` if it was absent
    pub fn delete(&self, table: TableId, key: &[u8]) -> Result<()> {
        self.with_table(table, |t| t.delete(key))
    }

    /// Number of live records in `table`
    pub fn len(&self, table: TableId) -> Result<usize> {
        self.with_table(table, |t| Ok(t.len()))
    }

    // =========================================================================
    // Enumeration
    // =========================================================================

    /// Restart `cursor` at the beginning of its table and return the first entry
    pub fn first(&self, cursor: &mut Cursor) -> Result<Option<TableEntry>> {
        let mut guard = self.tables.lock();
        let open = guard.as_mut().ok_or(VaultError::NotOpen)?;

        cursor.state = Some((open.session, TableCursor::new()));
        Self::advance(open, cursor)
    }

    /// Return the entry after the last one `cursor` returned
    ///
    /// An unstarted cursor behaves like `first`.
    pub fn next(&self, cursor: &mut Cursor) -> Result<Option<TableEntry>> {
        let mut guard = self.tables.lock();
        let open = guard.as_mut().ok_or(VaultError::NotOpen)?;

        match cursor.state {
            None => cursor.state = Some((open.session, TableCursor::new())),
            Some((session, ref mut position)) if session != open.session => {
                tracing::debug!(
                    "Cursor from session {} used in session {}, treating as exhausted",
                    session,
                    open.session
                );
                position.exhausted = true;
                return Ok(None);
            }
            Some(_) => {}
        }

        Self::advance(open, cursor)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Base path (without extension) of `table`'s files
    pub fn table_base(&self, table: TableId) -> PathBuf {
        self.config.data_dir.join(table.base_name())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Open one table; I/O failures surface as `Storage`
    fn open_table(&self, table: TableId) -> Result<HashTable> {
        HashTable::open(&self.table_base(table), table.layout(), &self.config).map_err(|e| {
            tracing::error!("Unable to open {} table: {}", table.base_name(), e);
            match e {
                VaultError::Io(io) => VaultError::Storage(format!(
                    "Unable to open {} table: {}",
                    table.base_name(),
                    io
                )),
                other => other,
            }
        })
    }

    fn with_table<T>(
        &self,
        table: TableId,
        op: impl FnOnce(&mut HashTable) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.tables.lock();
        let open = guard.as_mut().ok_or(VaultError::NotOpen)?;
        op(open.table_mut(table))
    }

    fn advance(open: &mut OpenTables, cursor: &mut Cursor) -> Result<Option<TableEntry>> {
        match cursor.state.as_mut() {
            Some((_, position)) => open.table_mut(cursor.table).advance(position),
            None => Ok(None),
        }
    }

    fn sync_tables(open: &mut OpenTables) {
        for table in [TableId::Catalog, TableId::Track] {
            if let Err(e) = open.table_mut(table).sync() {
                tracing::warn!("Failed to sync {} table: {}", table.base_name(), e);
            }
        }
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        self.close();
    }
}
