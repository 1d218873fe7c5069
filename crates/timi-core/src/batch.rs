//! Bulk add and delete
//!
//! Batch add reads CSV rows of the form
//!
//! ```text
//! startTime,duration,activityType,tags,metaTags,note
//! 2025-01-15 09:00,30,work,rust;cli,deep,"Fixed the parser, finally"
//! ```
//!
//! Tags and meta-tags are `;`-separated. Fields may be double-quoted, with
//! `""` standing for a literal quote. Blank lines and a header line starting
//! with `startTime` are skipped.
//!
//! Batch delete reads one entry ID per line.
//!
//! Every row goes through `EntryStore::save` or `EntryStore::delete_by_id`
//! on its own. A bad row is reported and skipped; a storage failure stops
//! the batch, leaving earlier rows applied.

use std::fs;
use std::path::Path;

use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{parse_start_time, Entry};
use crate::storage::{StoreError, StoreResult};
use crate::store::EntryStore;

/// Columns expected in a batch-add row
const CSV_COLUMNS: usize = 6;

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchReport {
    /// IDs added or deleted, in file order
    pub succeeded: Vec<Uuid>,
    /// Rows that were skipped
    pub failed: Vec<BatchFailure>,
}

/// A skipped row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// 1-based line number in the input file
    pub line: usize,
    pub reason: String,
}

impl BatchReport {
    fn fail(&mut self, line: usize, error: StoreError) -> StoreResult<()> {
        if error.is_storage_io() {
            return Err(error);
        }
        debug!(line, %error, "Skipping batch row");
        self.failed.push(BatchFailure {
            line,
            reason: error.to_string(),
        });
        Ok(())
    }
}

/// Add every entry listed in the CSV file at `path`
pub fn add_from_csv(store: &mut EntryStore, path: &Path) -> StoreResult<BatchReport> {
    let content = read_input(path)?;
    let mut report = BatchReport::default();

    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with("startTime") {
            continue;
        }
        let result = parse_csv_row(line).and_then(|entry| {
            store.save(&entry)?;
            Ok(entry.id)
        });
        match result {
            Ok(id) => report.succeeded.push(id),
            Err(e) => report.fail(idx + 1, e)?,
        }
    }

    info!(
        added = report.succeeded.len(),
        skipped = report.failed.len(),
        "Batch add finished"
    );
    Ok(report)
}

/// Delete every entry whose ID is listed in the file at `path`
pub fn delete_from_file(store: &mut EntryStore, path: &Path) -> StoreResult<BatchReport> {
    let content = read_input(path)?;
    let mut report = BatchReport::default();

    for (idx, line) in content.lines().enumerate() {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let result = Uuid::parse_str(input)
            .map_err(|_| StoreError::InvalidIdentifier(input.to_string()))
            .and_then(|id| {
                if store.delete_by_id(&id)? {
                    Ok(id)
                } else {
                    Err(StoreError::EntryNotFound(id))
                }
            });
        match result {
            Ok(id) => report.succeeded.push(id),
            Err(e) => report.fail(idx + 1, e)?,
        }
    }

    info!(
        deleted = report.succeeded.len(),
        failed = report.failed.len(),
        "Batch delete finished"
    );
    Ok(report)
}

/// Parse one batch-add row into a new, validated entry
pub fn parse_csv_row(line: &str) -> StoreResult<Entry> {
    let fields = split_csv_line(line);
    if fields.len() < CSV_COLUMNS {
        return Err(StoreError::InvalidEntry(format!(
            "expected {} columns, found {}",
            CSV_COLUMNS,
            fields.len()
        )));
    }

    let start = parse_start_time(&fields[0])?;
    let duration = fields[1].trim().parse::<u32>().map_err(|_| {
        StoreError::InvalidEntry(format!("invalid duration '{}'", fields[1].trim()))
    })?;

    let entry = Entry::new(start, duration, &fields[2])
        .with_tags(fields[3].split(';'))
        .with_meta_tags(fields[4].split(';'))
        .with_note(fields[5].trim());
    entry.validate()?;
    Ok(entry)
}

/// Split on commas outside double quotes, unquoting each field
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

fn read_input(path: &Path) -> StoreResult<String> {
    fs::read_to_string(path).map_err(|e| StoreError::from_read(e, path.to_path_buf()))
}
