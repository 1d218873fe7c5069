//! Data models for timi
//!
//! Defines the time entry record persisted by the store and the partial
//! update used to build its replacement. Entries are never modified in
//! place on disk: editing writes a new record carrying the same ID.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::storage::{check_placeable, StoreError, StoreResult};

/// Accepted date-time layouts for user-supplied start times, tried in order
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// One logged activity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Unique identifier
    pub id: Uuid,
    /// Local start time (no timezone)
    pub start_time: NaiveDateTime,
    /// Length of the activity in whole minutes
    pub duration_minutes: u32,
    /// Free-text note
    #[serde(default)]
    pub note: String,
    /// Activity type label, lowercase
    pub activity_type: String,
    /// Tags, lowercase
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: BTreeSet<String>,
    /// Meta-tags, lowercase
    #[serde(default, deserialize_with = "null_as_empty")]
    pub meta_tags: BTreeSet<String>,
}

impl Entry {
    /// Create a new entry with a freshly generated ID
    pub fn new(
        start_time: NaiveDateTime,
        duration_minutes: u32,
        activity_type: impl AsRef<str>,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), start_time, duration_minutes, activity_type)
    }

    /// Create an entry with a caller-supplied ID
    pub fn with_id(
        id: Uuid,
        start_time: NaiveDateTime,
        duration_minutes: u32,
        activity_type: impl AsRef<str>,
    ) -> Self {
        Self {
            id,
            start_time,
            duration_minutes,
            note: String::new(),
            activity_type: normalize_label(activity_type.as_ref()),
            tags: BTreeSet::new(),
            meta_tags: BTreeSet::new(),
        }
    }

    /// Set the note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Set the tags (normalized)
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_labels(tags);
        self
    }

    /// Set the meta-tags (normalized)
    pub fn with_meta_tags<I, S>(mut self, meta_tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.meta_tags = normalize_labels(meta_tags);
        self
    }

    /// When the activity ended
    pub fn end_time(&self) -> NaiveDateTime {
        self.start_time + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Check the fields required of entries created through user input
    pub fn validate(&self) -> StoreResult<()> {
        if self.duration_minutes == 0 {
            return Err(StoreError::InvalidEntry(
                "duration must be greater than zero minutes".to_string(),
            ));
        }
        if self.activity_type.is_empty() {
            return Err(StoreError::InvalidEntry(
                "activity type must not be empty".to_string(),
            ));
        }
        check_placeable(&self.start_time)
    }

    /// Case-insensitive tag match
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag.trim()))
    }

    /// Case-insensitive meta-tag match
    pub fn has_meta_tag(&self, meta_tag: &str) -> bool {
        self.meta_tags
            .iter()
            .any(|t| t.eq_ignore_ascii_case(meta_tag.trim()))
    }
}

/// Replacement values for an existing entry
///
/// Fields left as `None` keep the value of the entry being replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryUpdate {
    pub start_time: Option<NaiveDateTime>,
    pub duration_minutes: Option<u32>,
    pub note: Option<String>,
    pub activity_type: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub meta_tags: Option<BTreeSet<String>>,
}

impl EntryUpdate {
    /// An update that overwrites every field with the values of `entry`
    pub fn replace_all(entry: &Entry) -> Self {
        Self {
            start_time: Some(entry.start_time),
            duration_minutes: Some(entry.duration_minutes),
            note: Some(entry.note.clone()),
            activity_type: Some(entry.activity_type.clone()),
            tags: Some(entry.tags.clone()),
            meta_tags: Some(entry.meta_tags.clone()),
        }
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Build the replacement record, keeping the ID of `existing`
    pub fn apply(&self, existing: &Entry) -> Entry {
        Entry {
            id: existing.id,
            start_time: self.start_time.unwrap_or(existing.start_time),
            duration_minutes: self.duration_minutes.unwrap_or(existing.duration_minutes),
            note: self.note.clone().unwrap_or_else(|| existing.note.clone()),
            activity_type: self
                .activity_type
                .as_deref()
                .map(normalize_label)
                .unwrap_or_else(|| existing.activity_type.clone()),
            tags: self
                .tags
                .as_ref()
                .map(normalize_labels)
                .unwrap_or_else(|| existing.tags.clone()),
            meta_tags: self
                .meta_tags
                .as_ref()
                .map(normalize_labels)
                .unwrap_or_else(|| existing.meta_tags.clone()),
        }
    }
}

/// Parse a local start time such as `2025-01-15T09:00` or `2025-01-15 09:00:30`
///
/// Years that cannot be stored are rejected along with malformed input.
pub fn parse_start_time(s: &str) -> StoreResult<NaiveDateTime> {
    let s = s.trim();
    let parsed = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .ok_or_else(|| {
            StoreError::InvalidEntry(format!(
                "unrecognized date-time '{}'; use 'YYYY-MM-DDTHH:MM[:SS]' or 'YYYY-MM-DD HH:MM[:SS]'",
                s
            ))
        })?;
    check_placeable(&parsed)?;
    Ok(parsed)
}

/// Trim and lowercase a type or tag label
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Normalize a collection of labels into a set, dropping blanks
pub fn normalize_labels<I, S>(labels: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    labels
        .into_iter()
        .map(|l| normalize_label(l.as_ref()))
        .filter(|l| !l.is_empty())
        .collect()
}

/// `null` and missing tag collections both read as empty sets
pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let labels: Option<BTreeSet<String>> = Option::deserialize(deserializer)?;
    Ok(labels.unwrap_or_default())
}
