//! Storage error handling
//!
//! Provides typed errors for shard, index and undo-journal operations with
//! descriptive messages and recovery suggestions.

use std::io;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full or quota exceeded
    #[error(
        "Disk full or quota exceeded while writing to '{path}'. Free up disk space and try again."
    )]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read file
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write file
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// File content cannot be parsed (corrupt shard, index or journal)
    #[error("Invalid data format in '{path}': {details}")]
    InvalidFormat { path: PathBuf, details: String },

    /// Atomic write failed during rename
    #[error("Atomic write failed: could not rename '{from}' to '{to}': {source}")]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No entry with this identifier exists
    #[error("Entry not found: {0}")]
    EntryNotFound(Uuid),

    /// The undo journal file does not exist
    #[error("No undo journal at '{path}'")]
    UndoJournalNotFound { path: PathBuf },

    /// Nothing left to undo
    #[error("No undoable action found")]
    NoUndoAvailable,

    /// Caller supplied text that is not an entry identifier
    #[error("Invalid entry ID format: '{0}'")]
    InvalidIdentifier(String),

    /// An identifier prefix matches more than one entry
    #[error("Ambiguous entry ID '{prefix}': matches {matches} entries. Please provide more characters.")]
    AmbiguousIdentifier { prefix: String, matches: usize },

    /// Identifier is already stored
    #[error("An entry with ID {0} already exists")]
    DuplicateId(Uuid),

    /// Entry failed validation
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    /// A session is already running
    #[error("A session is already in progress (started {0})")]
    SessionActive(NaiveDateTime),

    /// No session is running
    #[error("No active session")]
    NoActiveSession,

    /// The session must be resumed before this operation
    #[error("Session is paused")]
    SessionPaused,

    /// The session is running, not paused
    #[error("Session is not paused")]
    SessionNotPaused,
}

impl StoreError {
    /// Create an error from a failed read with path context
    ///
    /// Classifies the error based on its kind (permission, missing, etc.)
    pub fn from_read(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StoreError::PermissionDenied {
                path,
                source: error,
            },
            _ => StoreError::ReadError {
                path,
                source: error,
            },
        }
    }

    /// Create an error from a failed write with path context
    ///
    /// Classifies the error based on its kind (permission, disk full, etc.)
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StoreError::PermissionDenied {
                path,
                source: error,
            },
            // StorageFull is not stable on all toolchains; match on the message too
            _ if is_disk_full_error(&error) => StoreError::DiskFull {
                path,
                source: error,
            },
            _ => StoreError::WriteError {
                path,
                source: error,
            },
        }
    }

    /// Whether this is a storage I/O failure (unreadable, unwritable or corrupt data)
    pub fn is_storage_io(&self) -> bool {
        matches!(
            self,
            StoreError::CreateDirectory { .. }
                | StoreError::PermissionDenied { .. }
                | StoreError::DiskFull { .. }
                | StoreError::ReadError { .. }
                | StoreError::WriteError { .. }
                | StoreError::InvalidFormat { .. }
                | StoreError::AtomicWriteFailed { .. }
        )
    }

    /// Whether the requested entry or journal does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::EntryNotFound(_)
                | StoreError::UndoJournalNotFound { .. }
                | StoreError::NoUndoAvailable
                | StoreError::NoActiveSession
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::DiskFull { .. } => Some("Free up disk space and try again."),
            StoreError::PermissionDenied { .. } => {
                Some("Check file and directory permissions of the timi data directory.")
            }
            StoreError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StoreError::InvalidFormat { .. } => {
                Some("Fix or remove the damaged file, then run `timi index rebuild`.")
            }
            StoreError::EntryNotFound(_) => {
                Some("If the entry should exist, run `timi index validate` to check for drift.")
            }
            StoreError::SessionActive(_) => {
                Some("Run `timi stop` to save it or `timi abort` to discard it.")
            }
            StoreError::NoActiveSession => Some("Start one with `timi start`."),
            StoreError::SessionPaused => Some("Run `timi resume` first."),
            _ => None,
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
