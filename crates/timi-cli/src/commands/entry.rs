//! Entry command handlers

use anyhow::{bail, Context, Result};
use clap::Args;

use timi_core::{Entry, EntryStore, EntryUpdate};

use crate::input::{parse_datetime, parse_tags, validate_month_filter};
use crate::output::Output;

#[derive(Args)]
pub struct NewEntryArgs {
    /// Start time (e.g. '2025-01-15T09:00' or '2025-01-15 09:00')
    #[arg(short, long)]
    pub start: String,
    /// Duration in minutes
    #[arg(short, long)]
    pub duration: u32,
    /// Activity type
    #[arg(short = 't', long = "type")]
    pub activity_type: String,
    /// Note
    #[arg(short, long, default_value = "")]
    pub note: String,
    /// Comma-separated tags
    #[arg(long)]
    pub tags: Option<String>,
    /// Comma-separated meta-tags
    #[arg(long)]
    pub meta_tags: Option<String>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Entry ID (full UUID or prefix)
    pub id: String,
    /// New start time
    #[arg(short, long)]
    pub start: Option<String>,
    /// New duration in minutes
    #[arg(short, long)]
    pub duration: Option<u32>,
    /// New note
    #[arg(short, long)]
    pub note: Option<String>,
    /// New activity type
    #[arg(short = 't', long = "type")]
    pub activity_type: Option<String>,
    /// New comma-separated tags (replaces existing tags)
    #[arg(long)]
    pub tags: Option<String>,
    /// New comma-separated meta-tags (replaces existing meta-tags)
    #[arg(long)]
    pub meta_tags: Option<String>,
}

/// Log a new entry
pub fn add(store: &mut EntryStore, args: NewEntryArgs, output: &Output) -> Result<()> {
    let start = parse_datetime(&args.start)?;

    let mut entry = Entry::new(start, args.duration, &args.activity_type).with_note(args.note);
    if let Some(tags) = args.tags {
        entry = entry.with_tags(parse_tags(&tags));
    }
    if let Some(meta_tags) = args.meta_tags {
        entry = entry.with_meta_tags(parse_tags(&meta_tags));
    }
    entry.validate()?;

    store.save(&entry).context("Failed to save entry")?;

    output.success(&format!("Added entry: {}", entry.id));
    output.print_entry(&entry);
    Ok(())
}

/// Show a single entry
pub fn show(store: &EntryStore, id: &str, output: &Output) -> Result<()> {
    let id = store.resolve_id(id)?;

    let entry = store
        .find_by_id(&id)?
        .ok_or_else(|| anyhow::anyhow!("Entry not found: {}", id))?;

    output.print_entry(&entry);
    Ok(())
}

/// Edit the given fields of an entry
pub fn edit(store: &mut EntryStore, args: EditArgs, output: &Output) -> Result<()> {
    let id = store.resolve_id(&args.id)?;

    let existing = store
        .find_by_id(&id)?
        .ok_or_else(|| anyhow::anyhow!("Entry not found: {}", id))?;

    let update = EntryUpdate {
        start_time: args.start.as_deref().map(parse_datetime).transpose()?,
        duration_minutes: args.duration,
        note: args.note,
        activity_type: args.activity_type,
        tags: args.tags.as_deref().map(parse_tags),
        meta_tags: args.meta_tags.as_deref().map(parse_tags),
    };

    if update.is_empty() {
        bail!("No fields to change. Provide --start, --duration, --note, --type, --tags or --meta-tags.");
    }

    let updated = update.apply(&existing);
    if updated == existing {
        output.message("No changes detected. Entry remains unchanged.");
        return Ok(());
    }
    updated.validate()?;

    if !store
        .update_full(&id, &update)
        .context("Failed to update entry")?
    {
        bail!("Entry {} could not be updated. Run `timi index validate`.", id);
    }

    output.success("Entry updated");
    output.print_entry(&updated);
    Ok(())
}

/// Delete an entry
pub fn delete(store: &mut EntryStore, id: &str, output: &Output) -> Result<()> {
    let id = store.resolve_id(id)?;

    if !store.delete_by_id(&id).context("Failed to delete entry")? {
        bail!("Entry not found: {}", id);
    }

    output.success(&format!("Deleted entry: {} (use `timi undo` to restore)", id));
    Ok(())
}

/// Filters for `list`; all given filters must match
#[derive(Debug, Default)]
pub struct ListFilter {
    /// `YYYY-MM` or `YYYY`
    pub month: Option<String>,
    pub tag: Option<String>,
    pub activity_type: Option<String>,
    pub meta_tag: Option<String>,
}

impl ListFilter {
    fn matches(&self, entry: &Entry) -> bool {
        self.tag.as_deref().map_or(true, |t| entry.has_tag(t))
            && self.meta_tag.as_deref().map_or(true, |t| entry.has_meta_tag(t))
            && self
                .activity_type
                .as_deref()
                .map_or(true, |t| entry.activity_type.eq_ignore_ascii_case(t.trim()))
    }
}

/// List entries, oldest first
pub fn list(store: &EntryStore, filter: &ListFilter, output: &Output) -> Result<()> {
    if let Some(month) = &filter.month {
        validate_month_filter(month)?;
    }

    let mut entries: Vec<Entry> = store
        .load_all(filter.month.as_deref())?
        .into_iter()
        .filter(|e| filter.matches(e))
        .collect();
    entries.sort_by_key(|e| e.start_time);

    output.print_entries(&entries);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry() -> Entry {
        let start = NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        Entry::new(start, 30, "work")
            .with_tags(["rust"])
            .with_meta_tags(["deep"])
    }

    #[test]
    fn test_list_filter_matches() {
        let e = entry();

        assert!(ListFilter::default().matches(&e));
        assert!(ListFilter {
            tag: Some("Rust".into()),
            meta_tag: Some("deep".into()),
            activity_type: Some(" WORK ".into()),
            ..Default::default()
        }
        .matches(&e));

        assert!(!ListFilter {
            meta_tag: Some("shallow".into()),
            ..Default::default()
        }
        .matches(&e));
        assert!(!ListFilter {
            tag: Some("rust".into()),
            activity_type: Some("meeting".into()),
            ..Default::default()
        }
        .matches(&e));
    }
}
