//! Unified storage interface
//!
//! The `EntryStore` owns the ID index for the lifetime of the process and
//! coordinates between:
//! - Shards (month files, source of truth)
//! - Index (ID -> shard, derived)
//! - Undo journal (last mutation)
//!
//! Every mutation rewrites the affected shard(s), persists the index and
//! then records an undo action. Nothing is rolled back if a step fails
//! part-way; `validate_index` and `rebuild_index` are the recovery tools.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = EntryStore::open()?;
//!
//! let entry = Entry::new(start, 30, "work");
//! store.save(&entry)?;
//!
//! let found = store.find_by_id(&entry.id)?;
//! ```

use anyhow::Context;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::models::{Entry, EntryUpdate};
use crate::storage::{
    check_placeable, partition_label_for, IndexManager, Issue, ShardSource, ShardStore,
    StoreError, StoreResult, UndoAction, UndoKind, UndoLog,
};

/// Unified storage interface for time entries
pub struct EntryStore {
    shards: ShardStore,
    index: IndexManager,
    undo: UndoLog,
    config: Config,
}

impl EntryStore {
    /// Open the store using the default configuration
    pub fn open() -> anyhow::Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config).context("Failed to open entry store")
    }

    /// Open the store with a specific configuration
    ///
    /// Loads the index once; it stays in memory until the store is dropped.
    pub fn open_with_config(config: Config) -> StoreResult<Self> {
        let shards = ShardStore::new(config.entries_dir());
        let index = IndexManager::open(config.index_path())?;
        let undo = UndoLog::new(config.undo_path());

        Ok(Self {
            shards,
            index,
            undo,
            config,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read-only view of the index
    pub fn index(&self) -> &IndexManager {
        &self.index
    }

    // ==================== Entry Operations ====================

    /// Store a new entry in the shard for its start month
    ///
    /// Fails with `DuplicateId` if the ID is already indexed and with
    /// `InvalidEntry` if the start year has no shard label.
    pub fn save(&mut self, entry: &Entry) -> StoreResult<()> {
        if self.index.lookup(&entry.id).is_some() {
            return Err(StoreError::DuplicateId(entry.id));
        }

        self.insert(entry)?;
        self.undo.record(UndoKind::Add, None, Some(entry))?;
        info!(id = %entry.id, "Saved entry");
        Ok(())
    }

    /// Look up an entry by ID
    ///
    /// Returns `None` when the ID is not indexed, and also when the indexed
    /// shard does not contain it (index drift).
    pub fn find_by_id(&self, id: &Uuid) -> StoreResult<Option<Entry>> {
        let Some(label) = self.index.lookup(id) else {
            return Ok(None);
        };

        let found = self
            .shards
            .load_shard(label)?
            .into_iter()
            .find(|e| &e.id == id);

        if found.is_none() {
            warn!(%id, shard = %label, "Indexed entry missing from its shard; run index validate");
        }
        Ok(found)
    }

    /// Replace an entry with `update` merged over its current fields
    ///
    /// Moves the entry to another shard if its start month changes.
    /// Returns `false` if the ID is unknown or missing from its shard.
    pub fn update_full(&mut self, id: &Uuid, update: &EntryUpdate) -> StoreResult<bool> {
        let Some((before, after)) = self.replace(id, update)? else {
            return Ok(false);
        };

        self.undo.record(UndoKind::Edit, Some(&before), Some(&after))?;
        info!(%id, "Updated entry");
        Ok(true)
    }

    /// Delete an entry
    ///
    /// Returns `false` if the ID is unknown or missing from its shard.
    pub fn delete_by_id(&mut self, id: &Uuid) -> StoreResult<bool> {
        let Some(removed) = self.remove(id)? else {
            return Ok(false);
        };

        self.undo.record(UndoKind::Delete, Some(&removed), None)?;
        info!(%id, "Deleted entry");
        Ok(true)
    }

    /// Every stored entry, optionally only from shards whose label starts
    /// with `partition_prefix` (e.g. `"2025"` or `"2025-01"`)
    ///
    /// Entries come back in shard order; order within a shard is insertion order.
    pub fn load_all(&self, partition_prefix: Option<&str>) -> StoreResult<Vec<Entry>> {
        let mut all = Vec::new();
        for label in self.shards.list_labels()? {
            if let Some(prefix) = partition_prefix {
                if !label.as_str().starts_with(prefix) {
                    continue;
                }
            }
            all.extend(self.shards.load_shard(&label)?);
        }
        Ok(all)
    }

    /// Resolve user input to an entry ID
    ///
    /// Accepts a full UUID or a unique prefix of an indexed ID.
    pub fn resolve_id(&self, input: &str) -> StoreResult<Uuid> {
        let input = input.trim();
        if let Ok(id) = Uuid::parse_str(input) {
            return Ok(id);
        }

        let prefix = input.to_lowercase();
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
            return Err(StoreError::InvalidIdentifier(input.to_string()));
        }

        let matches: Vec<Uuid> = self
            .index
            .iter()
            .map(|(id, _)| *id)
            .filter(|id| id.to_string().starts_with(&prefix))
            .collect();

        match matches.as_slice() {
            [] => Err(StoreError::InvalidIdentifier(input.to_string())),
            [id] => Ok(*id),
            _ => Err(StoreError::AmbiguousIdentifier {
                prefix: input.to_string(),
                matches: matches.len(),
            }),
        }
    }

    // ==================== Index ====================

    /// Regenerate the index from shard contents; returns the number of IDs indexed
    pub fn rebuild_index(&mut self) -> StoreResult<usize> {
        self.index.rebuild(&self.shards)
    }

    /// Report every disagreement between index and shards
    pub fn validate_index(&self) -> StoreResult<Vec<Issue>> {
        self.index.validate(&self.shards)
    }

    // ==================== Undo ====================

    /// The recorded last action, if any, without consuming it
    pub fn last_action(&self) -> StoreResult<Option<UndoAction>> {
        match self.undo.read() {
            Ok(action) => Ok(Some(action)),
            Err(StoreError::UndoJournalNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Reverse the last recorded mutation and clear the journal
    ///
    /// Returns a description of what was undone. Reversal itself is not
    /// journaled, so it cannot be undone in turn.
    pub fn undo_last(&mut self) -> StoreResult<String> {
        let action = match self.undo.read() {
            Ok(action) => action,
            Err(StoreError::UndoJournalNotFound { .. }) => return Err(StoreError::NoUndoAvailable),
            Err(e) => return Err(e),
        };

        let description = match action.action {
            UndoKind::Add => {
                let added = self.snapshot(action.entry_after.as_ref(), "entryAfter")?;
                if self.remove(&added.id)?.is_none() {
                    return Err(StoreError::EntryNotFound(added.id));
                }
                format!("Added entry {} has been removed.", added.id)
            }
            UndoKind::Delete => {
                let deleted = self.snapshot(action.entry_before.as_ref(), "entryBefore")?;
                if self.index.lookup(&deleted.id).is_some() {
                    return Err(StoreError::DuplicateId(deleted.id));
                }
                self.insert(deleted)?;
                format!("Deleted entry {} has been restored.", deleted.id)
            }
            UndoKind::Edit => {
                let previous = self.snapshot(action.entry_before.as_ref(), "entryBefore")?;
                let update = EntryUpdate::replace_all(previous);
                if self.replace(&previous.id, &update)?.is_none() {
                    return Err(StoreError::EntryNotFound(previous.id));
                }
                format!("Entry {} reverted to previous state.", previous.id)
            }
        };

        self.undo.clear()?;
        info!(action = %action.action, "Undid last action");
        Ok(description)
    }

    // ==================== Internals ====================

    /// Append to the target shard and index it, without journaling
    fn insert(&mut self, entry: &Entry) -> StoreResult<()> {
        check_placeable(&entry.start_time)?;
        let label = partition_label_for(&entry.start_time);

        let mut entries = self.shards.load_shard(&label)?;
        entries.push(entry.clone());
        self.shards.save_shard(&label, &entries)?;

        self.index.put(entry.id, label);
        self.index.persist()
    }

    /// Remove from the indexed shard and unindex it, without journaling
    fn remove(&mut self, id: &Uuid) -> StoreResult<Option<Entry>> {
        let Some(label) = self.index.lookup(id).cloned() else {
            return Ok(None);
        };

        let mut entries = self.shards.load_shard(&label)?;
        let Some(pos) = entries.iter().position(|e| &e.id == id) else {
            warn!(%id, shard = %label, "Indexed entry missing from its shard; run index validate");
            return Ok(None);
        };
        let removed = entries.remove(pos);
        self.shards.save_shard(&label, &entries)?;

        self.index.remove(id);
        self.index.persist()?;
        Ok(Some(removed))
    }

    /// Replace an entry in place or move it across shards, without journaling
    ///
    /// When the month changes the new shard is written before the entry is
    /// taken out of the old one, so a failure in between leaves a duplicate
    /// (reported by `validate_index`) rather than losing the entry.
    fn replace(&mut self, id: &Uuid, update: &EntryUpdate) -> StoreResult<Option<(Entry, Entry)>> {
        let Some(current_label) = self.index.lookup(id).cloned() else {
            return Ok(None);
        };

        let mut current_entries = self.shards.load_shard(&current_label)?;
        let Some(pos) = current_entries.iter().position(|e| &e.id == id) else {
            warn!(%id, shard = %current_label, "Indexed entry missing from its shard; run index validate");
            return Ok(None);
        };

        let before = current_entries[pos].clone();
        let after = update.apply(&before);
        check_placeable(&after.start_time)?;
        let new_label = partition_label_for(&after.start_time);

        if new_label == current_label {
            current_entries[pos] = after.clone();
            self.shards.save_shard(&current_label, &current_entries)?;
            return Ok(Some((before, after)));
        }

        let mut new_entries = self.shards.load_shard(&new_label)?;
        new_entries.push(after.clone());
        self.shards.save_shard(&new_label, &new_entries)?;

        current_entries.remove(pos);
        self.shards.save_shard(&current_label, &current_entries)?;

        info!(%id, from = %current_label, to = %new_label, "Moved entry to another shard");
        self.index.put(*id, new_label);
        self.index.persist()?;

        Ok(Some((before, after)))
    }

    fn snapshot<'a>(&self, entry: Option<&'a Entry>, field: &str) -> StoreResult<&'a Entry> {
        entry.ok_or_else(|| StoreError::InvalidFormat {
            path: self.undo.path().to_path_buf(),
            details: format!("undo action is missing {}", field),
        })
    }
}
