//! Storage layer
//!
//! Handles the on-disk layout of the entry store.
//!
//! ## Architecture
//!
//! - **Shards**: one JSON file per calendar month, the source of truth
//! - **Index**: ID -> shard map, derived and rebuildable from the shards
//! - **Undo journal**: the last mutation, for one-step reversal

pub mod error;
pub mod index;
pub mod shard;
pub mod undo;

pub use error::{StoreError, StoreResult};
pub use index::{IndexManager, Issue, INDEX_FILE_NAME};
pub use shard::{check_placeable, partition_label_for, ShardLabel, ShardSource, ShardStore};
pub use undo::{UndoAction, UndoKind, UndoLog};
