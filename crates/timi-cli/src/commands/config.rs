//! Config command handlers

use anyhow::{Context, Result};

use timi_core::Config;

use crate::output::{Output, OutputFormat};

/// Show the effective configuration
pub fn show(config: &Config, output: &Output) -> Result<()> {
    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "entries_dir": config.entries_dir(),
                    "undo_path": config.undo_path(),
                    "session_path": config.session_path(),
                    "log_level": config.log_level,
                    "round_session_minutes": config.round_session_minutes
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:  {}", config.data_dir.display());
            println!(
                "  log_level: {}",
                config.log_level.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  round_session_minutes: {}",
                match config.round_session_minutes {
                    0 => "off".to_string(),
                    n => n.to_string(),
                }
            );
            println!();
            println!("Entries:     {}", config.entries_dir().display());
            println!("Undo file:   {}", config.undo_path().display());
            println!("Session:     {}", config.session_path().display());
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value and save it to the config file
pub fn set(mut config: Config, key: &str, value: &str, output: &Output) -> Result<()> {
    config.set(key, value)?;
    config.save().context("Failed to save configuration")?;

    output.success(&format!(
        "Set {} = {} (saved to {})",
        key,
        value,
        Config::config_file_path().display()
    ));
    Ok(())
}
