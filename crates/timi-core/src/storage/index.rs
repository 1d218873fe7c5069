//! Entry ID index
//!
//! Maps each entry ID to the shard that holds it, so lookups read a single
//! shard instead of scanning all of them. The index is derived data: shard
//! contents are the source of truth and `rebuild` regenerates it from them.
//!
//! On disk it is a JSON object keyed by ID, valued by shard file name:
//!
//! ```text
//! { "7c9e6679-7425-40de-944b-e07fc1f90ae7": "2025-01.json" }
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::storage::error::{StoreError, StoreResult};
use crate::storage::shard::{partition_label_for, read_json, write_json, ShardLabel, ShardSource};

/// File name of the persisted index
pub const INDEX_FILE_NAME: &str = "index.json";

/// A disagreement between the index and shard contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    /// The same ID was found in more than one shard
    DuplicateId { id: Uuid, shard: ShardLabel },
    /// An entry exists in a shard but the index has no mapping for it
    MissingIndexEntry { id: Uuid, shard: ShardLabel },
    /// The index points at a different shard than the one holding the entry
    IncorrectMapping {
        id: Uuid,
        actual: ShardLabel,
        indexed: ShardLabel,
    },
    /// The entry's start time belongs to another shard
    Misfiled {
        id: Uuid,
        shard: ShardLabel,
        expected: ShardLabel,
    },
    /// The index references an ID that no shard contains
    OrphanIndexEntry { id: Uuid, indexed: ShardLabel },
}

impl Issue {
    /// The entry ID this issue is about
    pub fn id(&self) -> Uuid {
        match self {
            Issue::DuplicateId { id, .. }
            | Issue::MissingIndexEntry { id, .. }
            | Issue::IncorrectMapping { id, .. }
            | Issue::Misfiled { id, .. }
            | Issue::OrphanIndexEntry { id, .. } => *id,
        }
    }

    /// Short machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            Issue::DuplicateId { .. } => "duplicate_id",
            Issue::MissingIndexEntry { .. } => "missing_index_entry",
            Issue::IncorrectMapping { .. } => "incorrect_index_mapping",
            Issue::Misfiled { .. } => "misfiled_entry",
            Issue::OrphanIndexEntry { .. } => "orphan_index_entry",
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::DuplicateId { id, shard } => {
                write!(f, "Duplicate entry ID found: {} (again in {})", id, shard)
            }
            Issue::MissingIndexEntry { id, shard } => {
                write!(f, "Missing index entry for ID: {} (stored in {})", id, shard)
            }
            Issue::IncorrectMapping {
                id,
                actual,
                indexed,
            } => write!(
                f,
                "Incorrect index mapping for ID {}: expected {}, found {}",
                id, actual, indexed
            ),
            Issue::Misfiled {
                id,
                shard,
                expected,
            } => write!(
                f,
                "Entry {} appears misfiled: shard {} vs. entry date {}",
                id, shard, expected
            ),
            Issue::OrphanIndexEntry { id, indexed } => write!(
                f,
                "Index references missing entry ID: {} (indexed in {})",
                id, indexed
            ),
        }
    }
}

/// In-memory ID -> shard map backed by `index.json`
#[derive(Debug)]
pub struct IndexManager {
    path: PathBuf,
    entries: HashMap<Uuid, ShardLabel>,
}

impl IndexManager {
    /// Open the index at `path`, loading it if present
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let mut index = Self {
            path: path.into(),
            entries: HashMap::new(),
        };
        index.load()?;
        Ok(index)
    }

    /// Path of the index file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the in-memory map with the persisted one
    ///
    /// A missing file yields an empty index.
    pub fn load(&mut self) -> StoreResult<()> {
        self.entries.clear();

        let Some(raw) = read_json::<BTreeMap<String, String>>(&self.path)? else {
            debug!(path = ?self.path, "No index file, starting empty");
            return Ok(());
        };

        for (id, file_name) in raw {
            let id = Uuid::parse_str(&id).map_err(|e| self.invalid(format!("key '{}': {}", id, e)))?;
            let label = ShardLabel::from_file_name(&file_name)
                .ok_or_else(|| self.invalid(format!("'{}' is not a shard file name", file_name)))?;
            self.entries.insert(id, label);
        }

        debug!(entries = self.entries.len(), "Loaded index");
        Ok(())
    }

    /// Write the in-memory map to disk
    pub fn persist(&self) -> StoreResult<()> {
        let raw: BTreeMap<String, String> = self
            .entries
            .iter()
            .map(|(id, label)| (id.to_string(), label.file_name()))
            .collect();
        write_json(&self.path, &raw)?;
        debug!(entries = raw.len(), "Persisted index");
        Ok(())
    }

    /// Shard currently holding `id`, if indexed
    pub fn lookup(&self, id: &Uuid) -> Option<&ShardLabel> {
        self.entries.get(id)
    }

    /// Record that `id` lives in `label` (in memory only)
    pub fn put(&mut self, id: Uuid, label: ShardLabel) {
        self.entries.insert(id, label);
    }

    /// Forget `id` (in memory only)
    pub fn remove(&mut self, id: &Uuid) -> Option<ShardLabel> {
        self.entries.remove(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all mappings, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &ShardLabel)> {
        self.entries.iter()
    }

    /// Regenerate the index from shard contents and persist it
    ///
    /// When an ID turns up in more than one shard the first (oldest) shard
    /// keeps the mapping and the conflict is left for `validate` to report.
    /// Returns the number of indexed IDs.
    pub fn rebuild<S: ShardSource + ?Sized>(&mut self, source: &S) -> StoreResult<usize> {
        self.entries.clear();

        for label in source.list_labels()? {
            for entry in source.load_shard(&label)? {
                match self.entries.get(&entry.id) {
                    Some(existing) => warn!(
                        id = %entry.id,
                        first = %existing,
                        duplicate = %label,
                        "Duplicate entry ID found during index rebuild"
                    ),
                    None => {
                        self.entries.insert(entry.id, label.clone());
                    }
                }
            }
        }

        self.persist()?;
        info!(entries = self.entries.len(), "Rebuilt index");
        Ok(self.entries.len())
    }

    /// Compare the index against every shard without repairing anything
    ///
    /// An empty result means index and shards fully agree.
    pub fn validate<S: ShardSource + ?Sized>(&self, source: &S) -> StoreResult<Vec<Issue>> {
        let mut issues = Vec::new();
        let mut seen: HashSet<Uuid> = HashSet::new();

        for label in source.list_labels()? {
            for entry in source.load_shard(&label)? {
                let id = entry.id;

                if !seen.insert(id) {
                    issues.push(Issue::DuplicateId {
                        id,
                        shard: label.clone(),
                    });
                }

                match self.entries.get(&id) {
                    None => issues.push(Issue::MissingIndexEntry {
                        id,
                        shard: label.clone(),
                    }),
                    Some(indexed) if indexed != &label => issues.push(Issue::IncorrectMapping {
                        id,
                        actual: label.clone(),
                        indexed: indexed.clone(),
                    }),
                    Some(_) => {}
                }

                let expected = partition_label_for(&entry.start_time);
                if expected != label {
                    issues.push(Issue::Misfiled {
                        id,
                        shard: label.clone(),
                        expected,
                    });
                }
            }
        }

        let mut orphans: Vec<(&Uuid, &ShardLabel)> = self
            .entries
            .iter()
            .filter(|(id, _)| !seen.contains(id))
            .collect();
        orphans.sort();
        issues.extend(orphans.into_iter().map(|(id, indexed)| Issue::OrphanIndexEntry {
            id: *id,
            indexed: indexed.clone(),
        }));

        Ok(issues)
    }

    fn invalid(&self, details: String) -> StoreError {
        StoreError::InvalidFormat {
            path: self.path.clone(),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Entry;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    /// Shards held in memory
    #[derive(Default)]
    struct MemShards(BTreeMap<ShardLabel, Vec<Entry>>);

    impl MemShards {
        fn push(&mut self, label: &str, entry: Entry) {
            self.0
                .entry(ShardLabel::parse(label).unwrap())
                .or_default()
                .push(entry);
        }
    }

    impl ShardSource for MemShards {
        fn list_labels(&self) -> StoreResult<BTreeSet<ShardLabel>> {
            Ok(self.0.keys().cloned().collect())
        }

        fn load_shard(&self, label: &ShardLabel) -> StoreResult<Vec<Entry>> {
            Ok(self.0.get(label).cloned().unwrap_or_default())
        }
    }

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn label(s: &str) -> ShardLabel {
        ShardLabel::parse(s).unwrap()
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let index = IndexManager::open(temp_dir.path().join(INDEX_FILE_NAME)).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_persist_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(INDEX_FILE_NAME);
        let id = Uuid::new_v4();

        let mut index = IndexManager::open(&path).unwrap();
        index.put(id, label("2025-01"));
        index.persist().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains(&id.to_string()));
        assert!(content.contains("2025-01.json"));

        let reloaded = IndexManager::open(&path).unwrap();
        assert_eq!(reloaded.lookup(&id), Some(&label("2025-01")));
    }

    #[test]
    fn test_put_and_remove_are_in_memory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(INDEX_FILE_NAME);
        let id = Uuid::new_v4();

        let mut index = IndexManager::open(&path).unwrap();
        index.put(id, label("2025-01"));
        assert!(!path.exists());

        assert_eq!(index.remove(&id), Some(label("2025-01")));
        assert!(index.lookup(&id).is_none());
    }

    #[test]
    fn test_load_rejects_bad_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(INDEX_FILE_NAME);
        fs::write(&path, r#"{ "not-a-uuid": "2025-01.json" }"#).unwrap();

        let err = IndexManager::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::InvalidFormat { .. }));
    }

    #[test]
    fn test_load_rejects_bad_shard_names() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(INDEX_FILE_NAME);
        fs::write(&path, format!(r#"{{ "{}": "index.json" }}"#, Uuid::new_v4())).unwrap();

        assert!(IndexManager::open(&path).is_err());
    }

    #[test]
    fn test_rebuild_indexes_every_entry() {
        let temp_dir = TempDir::new().unwrap();
        let mut shards = MemShards::default();
        let a = Entry::new(at(2025, 1, 2), 30, "work");
        let b = Entry::new(at(2025, 1, 9), 30, "work");
        let c = Entry::new(at(2025, 2, 1), 30, "work");
        shards.push("2025-01", a.clone());
        shards.push("2025-01", b.clone());
        shards.push("2025-02", c.clone());

        let path = temp_dir.path().join(INDEX_FILE_NAME);
        let mut index = IndexManager::open(&path).unwrap();
        index.put(Uuid::new_v4(), label("2024-12"));

        assert_eq!(index.rebuild(&shards).unwrap(), 3);
        assert_eq!(index.lookup(&a.id), Some(&label("2025-01")));
        assert_eq!(index.lookup(&c.id), Some(&label("2025-02")));
        assert!(index.validate(&shards).unwrap().is_empty());

        // Persisted as part of the rebuild
        assert_eq!(IndexManager::open(&path).unwrap().len(), 3);
    }

    #[test]
    fn test_rebuild_keeps_first_shard_for_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        let mut shards = MemShards::default();
        let entry = Entry::new(at(2025, 1, 2), 30, "work");
        shards.push("2025-01", entry.clone());
        shards.push("2025-03", entry.clone());

        let mut index = IndexManager::open(temp_dir.path().join(INDEX_FILE_NAME)).unwrap();
        assert_eq!(index.rebuild(&shards).unwrap(), 1);
        assert_eq!(index.lookup(&entry.id), Some(&label("2025-01")));

        let issues = index.validate(&shards).unwrap();
        assert!(issues.contains(&Issue::DuplicateId {
            id: entry.id,
            shard: label("2025-03"),
        }));
    }

    #[test]
    fn test_validate_reports_each_kind() {
        let temp_dir = TempDir::new().unwrap();
        let mut shards = MemShards::default();

        let unindexed = Entry::new(at(2025, 1, 2), 30, "work");
        let wrongly_indexed = Entry::new(at(2025, 1, 3), 30, "work");
        let misfiled = Entry::new(at(2025, 4, 3), 30, "work");
        shards.push("2025-01", unindexed.clone());
        shards.push("2025-01", wrongly_indexed.clone());
        shards.push("2025-01", misfiled.clone());

        let orphan = Uuid::new_v4();
        let mut index = IndexManager::open(temp_dir.path().join(INDEX_FILE_NAME)).unwrap();
        index.put(wrongly_indexed.id, label("2025-02"));
        index.put(misfiled.id, label("2025-01"));
        index.put(orphan, label("2025-01"));

        let issues = index.validate(&shards).unwrap();
        assert_eq!(issues.len(), 4);
        assert_eq!(
            issues[0],
            Issue::MissingIndexEntry {
                id: unindexed.id,
                shard: label("2025-01"),
            }
        );
        assert_eq!(
            issues[1],
            Issue::IncorrectMapping {
                id: wrongly_indexed.id,
                actual: label("2025-01"),
                indexed: label("2025-02"),
            }
        );
        assert_eq!(
            issues[2],
            Issue::Misfiled {
                id: misfiled.id,
                shard: label("2025-01"),
                expected: label("2025-04"),
            }
        );
        assert_eq!(
            issues[3],
            Issue::OrphanIndexEntry {
                id: orphan,
                indexed: label("2025-01"),
            }
        );
    }

    #[test]
    fn test_validate_does_not_repair() {
        let temp_dir = TempDir::new().unwrap();
        let mut shards = MemShards::default();
        let entry = Entry::new(at(2025, 1, 2), 30, "work");
        shards.push("2025-01", entry.clone());

        let index = IndexManager::open(temp_dir.path().join(INDEX_FILE_NAME)).unwrap();
        assert_eq!(index.validate(&shards).unwrap().len(), 1);
        assert_eq!(index.validate(&shards).unwrap().len(), 1);
        assert!(index.lookup(&entry.id).is_none());
    }

    #[test]
    fn test_issue_display() {
        let id = Uuid::new_v4();
        let issue = Issue::DuplicateId {
            id,
            shard: label("2025-01"),
        };
        assert!(issue.to_string().contains("Duplicate entry ID"));
        assert!(issue.to_string().contains(&id.to_string()));
        assert_eq!(issue.kind(), "duplicate_id");
        assert_eq!(issue.id(), id);
    }
}
