//! Parsing of command-line values

use std::collections::BTreeSet;

use anyhow::{bail, Result};
use chrono::NaiveDateTime;

use timi_core::models::{normalize_labels, parse_start_time};

/// Parse a local date-time such as `2025-01-15T09:00` or `2025-01-15 09:00:30`
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime> {
    Ok(parse_start_time(s)?)
}

/// Split a comma-separated tag list into normalized tags
pub fn parse_tags(s: &str) -> BTreeSet<String> {
    normalize_labels(s.split(','))
}

/// Check a `YYYY` or `YYYY-MM` filter
pub fn validate_month_filter(s: &str) -> Result<()> {
    let valid = match s.len() {
        4 => s.bytes().all(|b| b.is_ascii_digit()),
        7 => timi_core::ShardLabel::parse(s).is_some(),
        _ => false,
    };
    if !valid {
        bail!("Invalid month '{}'. Use 'YYYY-MM' or 'YYYY'.", s);
    }
    Ok(())
}
