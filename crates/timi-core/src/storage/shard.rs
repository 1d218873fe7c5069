//! Month-partitioned entry files
//!
//! Every entry lives in exactly one shard: the JSON file named after the
//! year and month of its start time.
//!
//! ```text
//! ~/.timi/entries/
//!   2025-01.json    # all entries starting in January 2025
//!   2025-02.json
//!   index.json      # id -> shard file (see `index`)
//! ```
//!
//! Writes go through `atomic_write` (temp file, fsync, rename), so a shard
//! is never observed half-written.

use std::collections::BTreeSet;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDateTime};
use serde::Serialize;
use tracing::debug;

use crate::models::Entry;
use crate::storage::error::{StoreError, StoreResult};

/// Extension of shard files
pub const SHARD_EXTENSION: &str = "json";

/// Years a shard label can name (four digits, no sign)
pub const SHARD_YEARS: RangeInclusive<i32> = 0..=9999;

/// Partition label of a shard (`YYYY-MM`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShardLabel(String);

impl ShardLabel {
    /// Parse a `YYYY-MM` label
    ///
    /// Returns `None` for anything that is not a four-digit year followed
    /// by a month between 01 and 12.
    pub fn parse(label: &str) -> Option<Self> {
        let (year, month) = label.split_once('-')?;
        if year.len() != 4 || month.len() != 2 {
            return None;
        }
        if !year.bytes().all(|b| b.is_ascii_digit()) || !month.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        let month: u32 = month.parse().ok()?;
        if !(1..=12).contains(&month) {
            return None;
        }
        Some(Self(label.to_string()))
    }

    /// Parse a shard file name such as `2025-01.json`
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(&format!(".{}", SHARD_EXTENSION))?;
        Self::parse(stem)
    }

    /// File name of this shard inside the entries directory
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.0, SHARD_EXTENSION)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShardLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reject start times whose year cannot be written as a shard label
///
/// Must hold before `partition_label_for` is used to place an entry;
/// otherwise the shard file would be invisible to `list_labels` and the
/// index would fail to load.
pub fn check_placeable(start_time: &NaiveDateTime) -> StoreResult<()> {
    if SHARD_YEARS.contains(&start_time.year()) {
        Ok(())
    } else {
        Err(StoreError::InvalidEntry(format!(
            "start year {} is outside the supported range {}..={}",
            start_time.year(),
            SHARD_YEARS.start(),
            SHARD_YEARS.end()
        )))
    }
}

/// The shard an entry starting at `start_time` belongs to
///
/// Every placement decision in the store goes through this function.
/// Only meaningful for start times accepted by `check_placeable`.
pub fn partition_label_for(start_time: &NaiveDateTime) -> ShardLabel {
    ShardLabel(format!("{:04}-{:02}", start_time.year(), start_time.month()))
}

/// Read access to all shards, as needed by index rebuild and validation
pub trait ShardSource {
    /// Every shard currently persisted, in chronological order
    fn list_labels(&self) -> StoreResult<BTreeSet<ShardLabel>>;

    /// Contents of one shard; empty if it does not exist
    fn load_shard(&self, label: &ShardLabel) -> StoreResult<Vec<Entry>>;
}

/// Durable read/write of shard files in one directory
#[derive(Debug, Clone)]
pub struct ShardStore {
    dir: PathBuf,
}

impl ShardStore {
    /// Create a shard store rooted at `dir`
    ///
    /// The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file backing `label`
    pub fn shard_path(&self, label: &ShardLabel) -> PathBuf {
        self.dir.join(label.file_name())
    }

    /// Overwrite the full contents of a shard
    pub fn save_shard(&self, label: &ShardLabel, entries: &[Entry]) -> StoreResult<()> {
        let path = self.shard_path(label);
        write_json(&path, entries)?;
        debug!(shard = %label, entries = entries.len(), "Wrote shard");
        Ok(())
    }
}

impl ShardSource for ShardStore {
    fn list_labels(&self) -> StoreResult<BTreeSet<ShardLabel>> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(StoreError::from_read(e, self.dir.clone())),
        };

        let mut labels = BTreeSet::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|e| StoreError::from_read(e, self.dir.clone()))?;
            let name = dir_entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            match ShardLabel::from_file_name(name) {
                Some(label) => {
                    labels.insert(label);
                }
                None => debug!(file = name, "Skipping non-shard file"),
            }
        }
        Ok(labels)
    }

    fn load_shard(&self, label: &ShardLabel) -> StoreResult<Vec<Entry>> {
        let path = self.shard_path(label);
        let entries: Vec<Entry> = read_json(&path)?.unwrap_or_default();
        debug!(shard = %label, entries = entries.len(), "Loaded shard");
        Ok(entries)
    }
}

/// Read and parse a JSON file; `None` when the file does not exist
pub(crate) fn read_json<T>(path: &Path) -> StoreResult<Option<T>>
where
    T: serde::de::DeserializeOwned,
{
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::from_read(e, path.to_path_buf())),
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| StoreError::InvalidFormat {
            path: path.to_path_buf(),
            details: e.to_string(),
        })
}

/// Serialize `value` as pretty JSON and write it atomically
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> StoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| StoreError::InvalidFormat {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;
    atomic_write(path, &bytes)
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::CreateDirectory {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StoreError::from_io(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StoreError::from_io(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| StoreError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|e| StoreError::AtomicWriteFailed {
        from: temp_path,
        to: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
