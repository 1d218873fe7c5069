//! Undo command handlers

use anyhow::Result;

use timi_core::{EntryStore, StoreError};

use crate::output::{print_entry_details, Output, OutputFormat};

/// Reverse the last add, edit or delete
pub fn undo(store: &mut EntryStore, output: &Output) -> Result<()> {
    match store.undo_last() {
        Ok(description) => {
            output.success(&format!("Undone: {}", description));
            Ok(())
        }
        Err(StoreError::NoUndoAvailable) => {
            output.message("No undoable action found.");
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context("Failed to undo last action")),
    }
}

/// Show the journaled action without undoing it
pub fn last(store: &EntryStore, output: &Output) -> Result<()> {
    let Some(action) = store.last_action()? else {
        output.message("No undoable action found.");
        return Ok(());
    };

    if output.is_json() {
        println!("{}", serde_json::to_string_pretty(&action)?);
        return Ok(());
    }

    match output.format {
        OutputFormat::Quiet => println!("{}", action.action),
        _ => {
            println!(
                "Last action: '{}' at {}",
                action.action,
                action.timestamp.format("%Y-%m-%d %H:%M:%S")
            );
            if let Some(ref after) = action.entry_after {
                println!("\nAfter:");
                print_entry_details(after, "  ");
            }
            if let Some(ref before) = action.entry_before {
                println!("\nBefore:");
                print_entry_details(before, "  ");
            }
        }
    }

    Ok(())
}
