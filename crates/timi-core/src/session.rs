//! Running work sessions
//!
//! A session is a live timer kept in `<data_dir>/session.json`; at most one
//! exists at a time. Stopping a session turns it into an entry saved through
//! `EntryStore::save`, so it is sharded, indexed and undoable like any
//! other added entry.
//!
//! ```text
//! start -> (pause -> resume)* -> stop   => entry saved, session cleared
//!                              -> abort  => session discarded
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{normalize_label, normalize_labels, null_as_empty, Entry};
use crate::storage::shard::{read_json, write_json};
use crate::storage::{StoreError, StoreResult};
use crate::store::EntryStore;

/// The persisted state of a running session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Becomes the ID of the saved entry
    pub id: Uuid,
    pub start: NaiveDateTime,
    #[serde(default)]
    pub paused: bool,
    /// Set while paused
    #[serde(default)]
    pub paused_at: Option<NaiveDateTime>,
    /// Paused time from completed pauses
    #[serde(default)]
    pub total_paused_seconds: i64,
    #[serde(default, rename = "type")]
    pub activity_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub note: String,
}

impl Session {
    /// A running session started at `start`
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            paused: false,
            paused_at: None,
            total_paused_seconds: 0,
            activity_type: None,
            tags: BTreeSet::new(),
            note: String::new(),
        }
    }

    /// Set the activity type; blank input leaves it unset
    pub fn with_activity_type(mut self, activity_type: impl AsRef<str>) -> Self {
        let activity_type = normalize_label(activity_type.as_ref());
        self.activity_type = (!activity_type.is_empty()).then_some(activity_type);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_labels(tags);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Stop the clock at `now`
    pub fn pause(&mut self, now: NaiveDateTime) -> StoreResult<()> {
        if self.paused {
            return Err(StoreError::SessionPaused);
        }
        self.paused = true;
        self.paused_at = Some(now);
        Ok(())
    }

    /// Restart the clock at `now`; returns the total paused seconds so far
    pub fn resume(&mut self, now: NaiveDateTime) -> StoreResult<i64> {
        if !self.paused {
            return Err(StoreError::SessionNotPaused);
        }
        self.total_paused_seconds = self.paused_seconds(now);
        self.paused = false;
        self.paused_at = None;
        Ok(self.total_paused_seconds)
    }

    /// Paused seconds up to `now`, including a pause still in progress
    pub fn paused_seconds(&self, now: NaiveDateTime) -> i64 {
        let current = match (self.paused, self.paused_at) {
            (true, Some(paused_at)) => (now - paused_at).num_seconds().max(0),
            _ => 0,
        };
        self.total_paused_seconds + current
    }

    /// Whole minutes worked up to `now`, excluding pauses
    ///
    /// With `round_to > 0` the result is rounded to the nearest multiple,
    /// halves rounding up.
    pub fn worked_minutes(&self, now: NaiveDateTime, round_to: u32) -> u32 {
        let active = (now - self.start).num_seconds() - self.paused_seconds(now);
        let minutes = u32::try_from(active.max(0) / 60).unwrap_or(u32::MAX);
        if round_to == 0 {
            return minutes;
        }
        let rounded = (u64::from(minutes) + u64::from(round_to / 2)) / u64::from(round_to)
            * u64::from(round_to);
        u32::try_from(rounded).unwrap_or(u32::MAX)
    }

    /// The entry this session records when stopped at `now`
    ///
    /// Fails while paused, without an activity type, and when the rounded
    /// duration is zero.
    pub fn to_entry(&self, now: NaiveDateTime, round_to: u32) -> StoreResult<Entry> {
        if self.paused {
            return Err(StoreError::SessionPaused);
        }
        let activity_type = self.activity_type.as_deref().ok_or_else(|| {
            StoreError::InvalidEntry("session has no activity type; pass one when stopping".into())
        })?;

        let entry = Entry::with_id(
            self.id,
            self.start,
            self.worked_minutes(now, round_to),
            activity_type,
        )
        .with_tags(&self.tags)
        .with_note(self.note.clone());
        entry.validate()?;
        Ok(entry)
    }
}

/// Values given when stopping a session; each replaces the session's own
#[derive(Debug, Clone, Default)]
pub struct StopDetails {
    pub activity_type: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub note: Option<String>,
}

impl StopDetails {
    fn apply(&self, mut session: Session) -> Session {
        if let Some(activity_type) = &self.activity_type {
            session = session.with_activity_type(activity_type);
        }
        if let Some(tags) = &self.tags {
            session = session.with_tags(tags);
        }
        if let Some(note) = &self.note {
            session.note = note.clone();
        }
        session
    }
}

/// Durable storage and lifecycle of the single running session
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The running session, if any
    pub fn load(&self) -> StoreResult<Option<Session>> {
        read_json(&self.path)
    }

    fn save(&self, session: &Session) -> StoreResult<()> {
        write_json(&self.path, session)
    }

    fn clear(&self) -> StoreResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::from_io(e, self.path.clone())),
        }
    }

    fn active(&self) -> StoreResult<Session> {
        self.load()?.ok_or(StoreError::NoActiveSession)
    }

    /// Begin `session`; fails if another one is running
    pub fn start(&self, session: Session) -> StoreResult<Session> {
        if let Some(active) = self.load()? {
            return Err(StoreError::SessionActive(active.start));
        }
        self.save(&session)?;
        info!(id = %session.id, start = %session.start, "Started session");
        Ok(session)
    }

    pub fn pause(&self, now: NaiveDateTime) -> StoreResult<Session> {
        let mut session = self.active()?;
        session.pause(now)?;
        self.save(&session)?;
        info!(id = %session.id, "Paused session");
        Ok(session)
    }

    pub fn resume(&self, now: NaiveDateTime) -> StoreResult<Session> {
        let mut session = self.active()?;
        let paused = session.resume(now)?;
        self.save(&session)?;
        info!(id = %session.id, paused_seconds = paused, "Resumed session");
        Ok(session)
    }

    /// Save the running session as an entry and clear it
    ///
    /// The entry reuses the session ID, so stopping again after the session
    /// file could not be removed finds the saved entry instead of adding a
    /// second one. On any error before the save the session is kept.
    pub fn stop(
        &self,
        store: &mut EntryStore,
        now: NaiveDateTime,
        details: &StopDetails,
    ) -> StoreResult<Entry> {
        let session = details.apply(self.active()?);

        if let Some(saved) = store.find_by_id(&session.id)? {
            warn!(id = %session.id, "Session was already saved; clearing it");
            self.clear()?;
            return Ok(saved);
        }

        let entry = session.to_entry(now, store.config().round_session_minutes)?;
        store.save(&entry)?;
        self.clear()?;
        info!(id = %entry.id, minutes = entry.duration_minutes, "Stopped session");
        Ok(entry)
    }

    /// Discard the running session without saving anything
    pub fn abort(&self) -> StoreResult<Session> {
        let session = self.active()?;
        self.clear()?;
        info!(id = %session.id, "Aborted session");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use chrono::{Duration, NaiveDate};
    use tempfile::TempDir;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn session_file(temp_dir: &TempDir) -> PathBuf {
        Config::with_data_dir(temp_dir.path()).session_path()
    }

    fn setup(temp_dir: &TempDir) -> (EntryStore, SessionStore) {
        let config = Config::with_data_dir(temp_dir.path());
        let sessions = SessionStore::new(config.session_path());
        let store = EntryStore::open_with_config(config).unwrap();
        (store, sessions)
    }

    #[test]
    fn test_worked_minutes_excludes_pauses() {
        let mut session = Session::new(at(9, 0));
        session.pause(at(9, 20)).unwrap();
        assert_eq!(session.paused_seconds(at(9, 30)), 600);
        assert_eq!(session.worked_minutes(at(9, 30), 0), 20);

        assert_eq!(session.resume(at(9, 35)).unwrap(), 900);
        assert_eq!(session.worked_minutes(at(10, 0), 0), 45);
    }

    #[test]
    fn test_worked_minutes_rounding() {
        let session = Session::new(at(9, 0));
        assert_eq!(session.worked_minutes(at(9, 22), 5), 20);
        assert_eq!(session.worked_minutes(at(9, 23), 5), 25);
        assert_eq!(session.worked_minutes(at(9, 25), 10), 30);
        assert_eq!(session.worked_minutes(at(9, 24), 10), 20);
        // Clock going backwards never yields a negative duration
        assert_eq!(session.worked_minutes(at(8, 0), 0), 0);
    }

    #[test]
    fn test_pause_and_resume_guard_state() {
        let mut session = Session::new(at(9, 0));
        assert!(matches!(
            session.resume(at(9, 5)),
            Err(StoreError::SessionNotPaused)
        ));
        session.pause(at(9, 5)).unwrap();
        assert!(matches!(
            session.pause(at(9, 6)),
            Err(StoreError::SessionPaused)
        ));
    }

    #[test]
    fn test_session_file_format() {
        let temp_dir = TempDir::new().unwrap();
        let (_, sessions) = setup(&temp_dir);

        let session = Session::new(at(9, 0))
            .with_activity_type("Work")
            .with_tags(["Rust"]);
        sessions.start(session.clone()).unwrap();

        let raw = fs::read_to_string(session_file(&temp_dir)).unwrap();
        assert!(raw.contains("\"start\""));
        assert!(raw.contains("\"totalPausedSeconds\""));
        assert!(raw.contains("\"type\": \"work\""));
        assert_eq!(sessions.load().unwrap(), Some(session));
    }

    #[test]
    fn test_null_session_fields_read_as_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let (_, sessions) = setup(&temp_dir);
        fs::write(
            session_file(&temp_dir),
            r#"{"id":"aaaa0000-0000-4000-8000-000000000001","start":"2025-01-15T09:00:00",
               "paused":false,"pausedAt":null,"totalPausedSeconds":0,
               "type":null,"tags":null,"note":""}"#,
        )
        .unwrap();

        let session = sessions.load().unwrap().unwrap();
        assert!(session.activity_type.is_none());
        assert!(session.tags.is_empty());
    }

    #[test]
    fn test_only_one_session_at_a_time() {
        let temp_dir = TempDir::new().unwrap();
        let (_, sessions) = setup(&temp_dir);

        sessions.start(Session::new(at(9, 0))).unwrap();
        assert!(matches!(
            sessions.start(Session::new(at(9, 30))),
            Err(StoreError::SessionActive(started)) if started == at(9, 0)
        ));
    }

    #[test]
    fn test_lifecycle_without_session() {
        let temp_dir = TempDir::new().unwrap();
        let (mut store, sessions) = setup(&temp_dir);

        assert!(sessions.load().unwrap().is_none());
        assert!(matches!(sessions.pause(at(9, 0)), Err(StoreError::NoActiveSession)));
        assert!(matches!(sessions.resume(at(9, 0)), Err(StoreError::NoActiveSession)));
        assert!(matches!(sessions.abort(), Err(StoreError::NoActiveSession)));
        assert!(matches!(
            sessions.stop(&mut store, at(9, 0), &StopDetails::default()),
            Err(StoreError::NoActiveSession)
        ));
    }

    #[test]
    fn test_stop_saves_entry_through_store() {
        let temp_dir = TempDir::new().unwrap();
        let (mut store, sessions) = setup(&temp_dir);

        let session = sessions
            .start(
                Session::new(at(9, 0))
                    .with_activity_type("work")
                    .with_tags(["rust"])
                    .with_note("refactor"),
            )
            .unwrap();
        sessions.pause(at(9, 30)).unwrap();
        sessions.resume(at(9, 40)).unwrap();

        let entry = sessions
            .stop(&mut store, at(10, 0), &StopDetails::default())
            .unwrap();

        assert_eq!(entry.id, session.id);
        assert_eq!(entry.start_time, at(9, 0));
        assert_eq!(entry.duration_minutes, 50);
        assert!(entry.has_tag("rust"));
        assert_eq!(store.find_by_id(&entry.id).unwrap(), Some(entry.clone()));
        assert!(store.validate_index().unwrap().is_empty());
        assert!(sessions.load().unwrap().is_none());

        // Stopping is an ordinary add for undo
        store.undo_last().unwrap();
        assert!(store.find_by_id(&entry.id).unwrap().is_none());
    }

    #[test]
    fn test_stop_applies_details_and_rounding() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::with_data_dir(temp_dir.path());
        config.round_session_minutes = 15;
        let sessions = SessionStore::new(config.session_path());
        let mut store = EntryStore::open_with_config(config).unwrap();

        sessions
            .start(Session::new(at(9, 0)).with_activity_type("work"))
            .unwrap();
        let details = StopDetails {
            activity_type: Some("Meeting".to_string()),
            tags: Some(["team".to_string()].into_iter().collect()),
            note: Some("planning".to_string()),
        };
        let entry = sessions.stop(&mut store, at(9, 38), &details).unwrap();

        assert_eq!(entry.activity_type, "meeting");
        assert!(entry.has_tag("team"));
        assert_eq!(entry.note, "planning");
        assert_eq!(entry.duration_minutes, 45);
    }

    #[test]
    fn test_stop_refusals_keep_session() {
        let temp_dir = TempDir::new().unwrap();
        let (mut store, sessions) = setup(&temp_dir);

        sessions.start(Session::new(at(9, 0))).unwrap();

        // No activity type
        assert!(matches!(
            sessions.stop(&mut store, at(10, 0), &StopDetails::default()),
            Err(StoreError::InvalidEntry(_))
        ));

        // Paused
        sessions.pause(at(9, 30)).unwrap();
        let details = StopDetails {
            activity_type: Some("work".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            sessions.stop(&mut store, at(10, 0), &details),
            Err(StoreError::SessionPaused)
        ));

        // Less than a minute worked
        sessions.resume(at(9, 30)).unwrap();
        assert!(matches!(
            sessions.stop(&mut store, at(9, 0) + Duration::seconds(30), &details),
            Err(StoreError::InvalidEntry(_))
        ));

        assert!(sessions.load().unwrap().is_some());
        assert!(store.index().is_empty());
    }

    #[test]
    fn test_stop_after_failed_clear_does_not_duplicate() {
        let temp_dir = TempDir::new().unwrap();
        let (mut store, sessions) = setup(&temp_dir);

        let session = Session::new(at(9, 0)).with_activity_type("work");
        sessions.start(session.clone()).unwrap();
        let entry = sessions
            .stop(&mut store, at(9, 45), &StopDetails::default())
            .unwrap();

        // Session file left behind as if removal had failed
        write_json(&session_file(&temp_dir), &session).unwrap();

        let again = sessions
            .stop(&mut store, at(11, 0), &StopDetails::default())
            .unwrap();
        assert_eq!(again, entry);
        assert_eq!(store.load_all(None).unwrap().len(), 1);
        assert!(sessions.load().unwrap().is_none());
    }

    #[test]
    fn test_abort_discards_session() {
        let temp_dir = TempDir::new().unwrap();
        let (store, sessions) = setup(&temp_dir);

        let session = sessions
            .start(Session::new(at(9, 0)).with_activity_type("work"))
            .unwrap();
        assert_eq!(sessions.abort().unwrap(), session);
        assert!(sessions.load().unwrap().is_none());
        assert!(store.index().is_empty());
        assert!(store.last_action().unwrap().is_none());
    }
}
