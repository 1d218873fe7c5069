//! Session command handlers

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use clap::Args;

use timi_core::{EntryStore, Session, SessionStore, StopDetails};

use crate::input::parse_tags;
use crate::output::Output;

#[derive(Args)]
pub struct SessionArgs {
    /// Activity type
    #[arg(short = 't', long = "type")]
    pub activity_type: Option<String>,
    /// Comma-separated tags
    #[arg(long)]
    pub tags: Option<String>,
    /// Note
    #[arg(short, long)]
    pub note: Option<String>,
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Start a new session
pub fn start(sessions: &SessionStore, args: SessionArgs, output: &Output) -> Result<()> {
    let mut session = Session::new(now());
    if let Some(activity_type) = args.activity_type {
        session = session.with_activity_type(activity_type);
    }
    if let Some(tags) = args.tags {
        session = session.with_tags(parse_tags(&tags));
    }
    if let Some(note) = args.note {
        session = session.with_note(note);
    }

    let session = sessions.start(session)?;
    output.success(&format!(
        "Session started at {}",
        session.start.format("%Y-%m-%d %H:%M")
    ));
    output.print_session(&session, session.start);
    Ok(())
}

/// Pause the running session
pub fn pause(sessions: &SessionStore, output: &Output) -> Result<()> {
    sessions.pause(now())?;
    output.success("Session paused.");
    Ok(())
}

/// Resume the paused session
pub fn resume(sessions: &SessionStore, output: &Output) -> Result<()> {
    let session = sessions.resume(now())?;
    output.success(&format!(
        "Session resumed. Total paused time: {} minutes",
        session.total_paused_seconds / 60
    ));
    Ok(())
}

/// Save the running session as an entry
///
/// Values given here replace those recorded at start.
pub fn stop(
    store: &mut EntryStore,
    sessions: &SessionStore,
    args: SessionArgs,
    output: &Output,
) -> Result<()> {
    let details = StopDetails {
        activity_type: args.activity_type,
        tags: args.tags.as_deref().map(parse_tags),
        note: args.note,
    };

    let entry = sessions
        .stop(store, now(), &details)
        .context("Failed to stop session")?;

    output.success(&format!(
        "Session saved: {} ({} min) [{}]",
        entry.activity_type, entry.duration_minutes, entry.id
    ));
    output.print_entry(&entry);
    Ok(())
}

/// Discard the running session
pub fn abort(sessions: &SessionStore, output: &Output) -> Result<()> {
    sessions.abort()?;
    output.success("Session aborted and discarded.");
    Ok(())
}

/// Show the running session
pub fn status(sessions: &SessionStore, output: &Output) -> Result<()> {
    match sessions.load()? {
        Some(session) => output.print_session(&session, now()),
        None => output.message("No active session."),
    }
    Ok(())
}
