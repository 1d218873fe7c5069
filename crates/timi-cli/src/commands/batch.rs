//! Batch command handlers

use std::path::Path;

use anyhow::{Context, Result};

use timi_core::{batch, EntryStore};

use crate::output::Output;

/// Add entries from a CSV file
pub fn add(store: &mut EntryStore, file: &Path, output: &Output) -> Result<()> {
    let report = batch::add_from_csv(store, file)
        .with_context(|| format!("Batch add from {} failed", file.display()))?;

    output.print_batch_report("Added", &report);
    Ok(())
}

/// Delete the entries whose IDs are listed in a file
pub fn delete(store: &mut EntryStore, file: &Path, output: &Output) -> Result<()> {
    let report = batch::delete_from_file(store, file)
        .with_context(|| format!("Batch delete from {} failed", file.display()))?;

    output.print_batch_report("Deleted", &report);
    Ok(())
}
