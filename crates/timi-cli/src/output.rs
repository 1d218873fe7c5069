//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use std::collections::BTreeSet;

use chrono::NaiveDateTime;

use timi_core::{BatchReport, Entry, Issue, Session};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a single entry
    pub fn print_entry(&self, entry: &Entry) {
        match self.format {
            OutputFormat::Human => print_entry_details(entry, ""),
            OutputFormat::Json => println!("{}", to_json(entry)),
            OutputFormat::Quiet => println!("{}", entry.id),
        }
    }

    /// Print a list of entries
    pub fn print_entries(&self, entries: &[Entry]) {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No entries found.");
                    return;
                }
                for entry in entries {
                    println!(
                        "{} | {} | {:>6} | {:<10} | {}",
                        &entry.id.to_string()[..8],
                        entry.start_time.format("%Y-%m-%d %H:%M"),
                        format_duration(entry.duration_minutes),
                        truncate(&entry.activity_type, 10),
                        truncate(&entry.note, 40)
                    );
                }
                let total: u64 = entries.iter().map(|e| u64::from(e.duration_minutes)).sum();
                println!(
                    "\n{} entr{}, {} total",
                    entries.len(),
                    if entries.len() == 1 { "y" } else { "ies" },
                    format_duration_long(total)
                );
            }
            OutputFormat::Json => println!("{}", to_json(&entries)),
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.id);
                }
            }
        }
    }

    /// Print index validation results
    pub fn print_issues(&self, issues: &[Issue]) {
        match self.format {
            OutputFormat::Human => {
                if issues.is_empty() {
                    println!("✓ Index is consistent with stored entries.");
                    return;
                }
                println!("✗ Found {} issue(s):", issues.len());
                for issue in issues {
                    println!("  • {}", issue);
                }
                println!();
                println!("Run `timi index rebuild` to regenerate the index from the shard files.");
            }
            OutputFormat::Json => {
                let json_issues: Vec<_> = issues
                    .iter()
                    .map(|i| {
                        serde_json::json!({
                            "kind": i.kind(),
                            "id": i.id(),
                            "message": i.to_string()
                        })
                    })
                    .collect();
                println!("{}", to_json(&json_issues));
            }
            OutputFormat::Quiet => {
                for issue in issues {
                    println!("{} {}", issue.kind(), issue.id());
                }
            }
        }
    }

    /// Print a running session as of `now`
    pub fn print_session(&self, session: &Session, now: NaiveDateTime) {
        let active_minutes = session.worked_minutes(now, 0);
        match self.format {
            OutputFormat::Human => {
                println!("Active session");
                println!("  Started:     {}", session.start.format("%Y-%m-%d %H:%M"));
                println!("  Paused:      {}", if session.paused { "yes" } else { "no" });
                println!(
                    "  Active time: {}",
                    format_duration_long(u64::from(active_minutes))
                );
                if let Some(activity_type) = &session.activity_type {
                    println!("  Type:        {}", activity_type);
                }
                if !session.tags.is_empty() {
                    println!("  Tags:        {}", join_labels(&session.tags));
                }
                if !session.note.is_empty() {
                    println!("  Note:        {}", session.note);
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "session": session,
                        "activeMinutes": active_minutes
                    })
                );
            }
            OutputFormat::Quiet => println!("{}", session.id),
        }
    }

    /// Print the outcome of a batch run; `verb` names what happened to the successes
    pub fn print_batch_report(&self, verb: &str, report: &BatchReport) {
        match self.format {
            OutputFormat::Human => {
                for id in &report.succeeded {
                    println!("✓ {} entry: {}", verb, id);
                }
                for failure in &report.failed {
                    println!("✗ Line {}: {}", failure.line, failure.reason);
                }
                println!(
                    "\nBatch completed. Success: {}, Failed: {}",
                    report.succeeded.len(),
                    report.failed.len()
                );
            }
            OutputFormat::Json => {
                let failed: Vec<_> = report
                    .failed
                    .iter()
                    .map(|f| serde_json::json!({"line": f.line, "reason": f.reason}))
                    .collect();
                println!(
                    "{}",
                    to_json(&serde_json::json!({
                        "succeeded": report.succeeded,
                        "failed": failed
                    }))
                );
            }
            OutputFormat::Quiet => {
                for id in &report.succeeded {
                    println!("{}", id);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Detailed multi-line view of an entry, each line prefixed with `indent`
pub fn print_entry_details(entry: &Entry, indent: &str) {
    println!("{}ID:        {}", indent, entry.id);
    println!(
        "{}Start:     {}",
        indent,
        entry.start_time.format("%Y-%m-%d %H:%M")
    );
    println!(
        "{}Duration:  {}",
        indent,
        format_duration_long(u64::from(entry.duration_minutes))
    );
    println!(
        "{}End:       {}",
        indent,
        entry.end_time().format("%Y-%m-%d %H:%M")
    );
    println!("{}Type:      {}", indent, entry.activity_type);
    println!("{}Tags:      {}", indent, join_labels(&entry.tags));
    println!("{}Meta tags: {}", indent, join_labels(&entry.meta_tags));
    println!("{}Note:      {}", indent, entry.note);
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

fn join_labels(labels: &BTreeSet<String>) -> String {
    if labels.is_empty() {
        "(none)".to_string()
    } else {
        labels.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Compact duration, e.g. `1h30m`
fn format_duration(minutes: u32) -> String {
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h{:02}m", h, m),
    }
}

/// Long duration, e.g. `1h 30m`
fn format_duration_long(minutes: u64) -> String {
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

/// Truncate a string to max length in characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    if first_line.chars().count() <= max_len {
        first_line.to_string()
    } else {
        let kept: String = first_line.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
