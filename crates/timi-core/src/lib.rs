//! timi Core Library
//!
//! This crate provides the storage core of timi, a personal activity log:
//! time entries persisted in month-sharded JSON files with a rebuildable ID
//! index and a single-step undo journal.
//!
//! # Architecture
//!
//! - **Shards**: source of truth, one file per calendar month
//! - **Index**: derived ID -> shard map for lookups without scanning
//!
//! Index drift (e.g. after editing files by hand) is detected by
//! `EntryStore::validate_index` and repaired by `EntryStore::rebuild_index`.
//!
//! # Quick Start
//!
//! ```text
//! let mut store = EntryStore::open()?;
//!
//! let entry = Entry::new(start, 30, "work").with_tags(["rust"]);
//! store.save(&entry)?;
//!
//! let january = store.load_all(Some("2025-01"))?;
//! ```
//!
//! # Modules
//!
//! - `store`: Unified storage interface (main entry point)
//! - `models`: The time entry record and partial updates
//! - `storage`: Shards, index, undo journal and error types
//! - `session`: The running work session and its conversion into an entry
//! - `batch`: Bulk add from CSV and bulk delete by ID
//! - `config`: Application configuration

pub mod batch;
pub mod config;
pub mod models;
pub mod session;
pub mod storage;
pub mod store;

pub use batch::BatchReport;
pub use config::Config;
pub use models::{Entry, EntryUpdate};
pub use session::{Session, SessionStore, StopDetails};
pub use storage::{Issue, ShardLabel, StoreError, StoreResult, UndoAction, UndoKind};
pub use store::EntryStore;
