//! Single-slot undo journal
//!
//! Holds the most recent mutation (`add`, `edit` or `delete`) together with
//! the entry as it was before and after. Each mutation overwrites the
//! previous record; a successful undo removes it.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::Entry;
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::shard::{read_json, write_json};

/// Kind of mutation recorded in the journal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndoKind {
    Add,
    Edit,
    Delete,
}

impl fmt::Display for UndoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UndoKind::Add => "add",
            UndoKind::Edit => "edit",
            UndoKind::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// The most recent mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoAction {
    pub action: UndoKind,
    pub timestamp: NaiveDateTime,
    pub entry_before: Option<Entry>,
    pub entry_after: Option<Entry>,
}

/// Journal file holding at most one `UndoAction`
#[derive(Debug, Clone)]
pub struct UndoLog {
    path: PathBuf,
}

impl UndoLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the journal with a new action stamped with the current time
    pub fn record(
        &self,
        action: UndoKind,
        before: Option<&Entry>,
        after: Option<&Entry>,
    ) -> StoreResult<()> {
        let record = UndoAction {
            action,
            timestamp: Local::now().naive_local(),
            entry_before: before.cloned(),
            entry_after: after.cloned(),
        };
        write_json(&self.path, &record)?;
        debug!(%action, "Recorded undo action");
        Ok(())
    }

    /// Read the journal
    ///
    /// Fails with `UndoJournalNotFound` when there is nothing recorded.
    pub fn read(&self) -> StoreResult<UndoAction> {
        read_json(&self.path)?.ok_or_else(|| StoreError::UndoJournalNotFound {
            path: self.path.clone(),
        })
    }

    /// Remove the journal; a missing journal is not an error
    pub fn clear(&self) -> StoreResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::from_io(e, self.path.clone())),
        }
    }
}
