//! Index command handlers

use anyhow::{Context, Result};

use timi_core::EntryStore;

use crate::output::{Output, OutputFormat};

/// Rebuild the index from the shard files
pub fn rebuild(store: &mut EntryStore, output: &Output) -> Result<()> {
    let indexed = store.rebuild_index().context("Failed to rebuild index")?;
    output.success(&format!(
        "Index rebuilt with {} entries ({}).",
        indexed,
        store.index().path().display()
    ));
    Ok(())
}

/// Report disagreements between the index and the shard files
pub fn validate(store: &EntryStore, output: &Output) -> Result<()> {
    let issues = store.validate_index().context("Failed to validate index")?;
    output.print_issues(&issues);
    Ok(())
}

/// List every index mapping, ordered by shard
pub fn show(store: &EntryStore, output: &Output) -> Result<()> {
    let mut mappings: Vec<_> = store.index().iter().collect();
    mappings.sort_by(|a, b| a.1.cmp(b.1).then(a.0.cmp(b.0)));

    match output.format {
        OutputFormat::Human => {
            if mappings.is_empty() {
                println!("Index is empty.");
                return Ok(());
            }
            for (id, label) in &mappings {
                println!("• {} → {}", id, label.file_name());
            }
            println!("\n{} indexed entr{}", mappings.len(), if mappings.len() == 1 { "y" } else { "ies" });
        }
        OutputFormat::Json => {
            let map: serde_json::Map<String, serde_json::Value> = mappings
                .iter()
                .map(|(id, label)| (id.to_string(), label.file_name().into()))
                .collect();
            println!("{}", serde_json::Value::Object(map));
        }
        OutputFormat::Quiet => {
            for (id, _) in &mappings {
                println!("{}", id);
            }
        }
    }

    Ok(())
}
