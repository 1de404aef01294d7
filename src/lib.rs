//! # cdvault
//!
//! A small embedded store for a music CD catalog:
//! - Fixed-layout catalog and track records
//! - Composite `"<catalog> <track_no>"` keys for tracks
//! - Hashed on-disk tables (`.dir` bucket file + `.pag` slot file)
//! - Resumable full-table scans with caller-owned cursors
//! - Fail-soft CRUD wrappers over an inspectable `Result` API
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Repository                            │
//! │          (CRUD, substring search, fail-soft wrappers)        │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │                              │
//!        ┌───────▼───────┐              ┌───────▼───────┐
//!        │  Key Builder  │              │ Record Codec  │
//!        └───────┬───────┘              └───────┬───────┘
//!                └──────────────┬───────────────┘
//!                               │
//! ┌─────────────────────────────▼───────────────────────────────┐
//! │                          Store                               │
//! │               (lifecycle, routing, cursors)                  │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │                              │
//!        ┌───────▼───────┐              ┌───────▼───────┐
//!        │ Catalog table │              │  Track table  │
//!        │  cdc_data.*   │              │  cdt_data.*   │
//!        └───────────────┘              └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod key;
pub mod table;
pub mod store;
pub mod repository;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, VaultError};
pub use config::{Config, SyncStrategy};
pub use record::{CatalogRecord, FixedRecord, TrackRecord};
pub use store::{Cursor, Store, TableId};
pub use repository::{CatalogSearch, EntryCounts, Repository};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of cdvault
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
