//! timi CLI
//!
//! Command-line interface for timi - a personal activity log.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use timi_core::{Config, EntryStore, SessionStore, StoreError};

mod commands;
mod input;
mod output;

use commands::entry::{EditArgs, NewEntryArgs};
use commands::session::SessionArgs;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "timi")]
#[command(about = "timi - Personal activity log")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a new entry
    Add(NewEntryArgs),
    /// Show an entry
    Show {
        /// Entry ID (full UUID or prefix)
        id: String,
    },
    /// Edit an entry; only the given fields change
    Edit(EditArgs),
    /// Delete an entry
    #[command(alias = "rm")]
    Delete {
        /// Entry ID (full UUID or prefix)
        id: String,
    },
    /// List entries
    #[command(alias = "ls")]
    List {
        /// Only entries from this month (YYYY-MM) or year (YYYY)
        #[arg(short, long)]
        month: Option<String>,
        /// Filter by tag
        #[arg(long)]
        tag: Option<String>,
        /// Filter by activity type
        #[arg(short = 't', long = "type")]
        activity_type: Option<String>,
        /// Filter by meta-tag
        #[arg(long)]
        meta_tag: Option<String>,
    },
    /// Start a work session
    Start(SessionArgs),
    /// Pause the running session
    Pause,
    /// Resume the paused session
    Resume,
    /// Stop the running session and save it as an entry
    Stop(SessionArgs),
    /// Discard the running session without saving
    Abort,
    /// Show the running session
    Status,
    /// Add or delete many entries from a file
    Batch {
        #[command(subcommand)]
        command: BatchCommands,
    },
    /// Manage the entry index
    Index {
        #[command(subcommand)]
        command: IndexCommands,
    },
    /// Undo the last add, edit or delete
    Undo,
    /// Show the last action that can be undone
    Last,
    /// Show configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum IndexCommands {
    /// Rebuild the index from the shard files
    Rebuild,
    /// Check the index against the shard files
    Validate,
    /// Show current index entries
    Show,
}

#[derive(Subcommand)]
enum BatchCommands {
    /// Add entries from a CSV file (startTime,duration,activityType,tags,metaTags,note)
    Add {
        /// Path to the CSV file
        #[arg(long)]
        file: PathBuf,
    },
    /// Delete entries whose IDs are listed one per line
    Delete {
        /// Path to the file of entry IDs
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, log_level, round_session_minutes)
        key: String,
        /// Value to set
        value: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    match run(cli, &output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_error(&err),
    }
}

/// Print an error with any recovery hint
fn report_error(err: &anyhow::Error) -> ExitCode {
    eprintln!("Error: {:#}", err);

    let store_err = find_store_error(err);
    if let Some(hint) = store_err.and_then(StoreError::recovery_suggestion) {
        eprintln!("Hint: {}", hint);
    }
    ExitCode::from(exit_status(store_err))
}

/// The storage error anywhere in the context chain
fn find_store_error(err: &anyhow::Error) -> Option<&StoreError> {
    err.chain().find_map(|e| e.downcast_ref::<StoreError>())
}

/// 2 when the thing asked for does not exist, 1 for every other failure
fn exit_status(store_err: Option<&StoreError>) -> u8 {
    if store_err.is_some_and(StoreError::is_not_found) {
        2
    } else {
        1
    }
}

fn run(cli: Cli, output: &Output) -> Result<()> {
    let config = Config::load()?;
    init_logging(&config);

    // Commands that don't need the entry store
    match &cli.command {
        Commands::Config { command } => {
            return match command {
                Some(ConfigCommands::Show) | None => commands::config::show(&config, output),
                Some(ConfigCommands::Set { key, value }) => {
                    commands::config::set(config, key, value, output)
                }
            };
        }
        Commands::Pause => return commands::session::pause(&sessions(&config), output),
        Commands::Resume => return commands::session::resume(&sessions(&config), output),
        Commands::Abort => return commands::session::abort(&sessions(&config), output),
        Commands::Status => return commands::session::status(&sessions(&config), output),
        _ => {}
    }

    let sessions = sessions(&config);
    let mut store = EntryStore::open_with_config(config)?;
    debug!(indexed = store.index().len(), "Opened entry store");

    match cli.command {
        Commands::Add(args) => commands::entry::add(&mut store, args, output),
        Commands::Show { id } => commands::entry::show(&store, &id, output),
        Commands::Edit(args) => commands::entry::edit(&mut store, args, output),
        Commands::Delete { id } => commands::entry::delete(&mut store, &id, output),
        Commands::List {
            month,
            tag,
            activity_type,
            meta_tag,
        } => commands::entry::list(
            &store,
            &commands::entry::ListFilter {
                month,
                tag,
                activity_type,
                meta_tag,
            },
            output,
        ),
        Commands::Start(args) => commands::session::start(&sessions, args, output),
        Commands::Stop(args) => commands::session::stop(&mut store, &sessions, args, output),
        Commands::Batch { command } => match command {
            BatchCommands::Add { file } => commands::batch::add(&mut store, &file, output),
            BatchCommands::Delete { file } => commands::batch::delete(&mut store, &file, output),
        },
        Commands::Index { command } => match command {
            IndexCommands::Rebuild => commands::index::rebuild(&mut store, output),
            IndexCommands::Validate => commands::index::validate(&store, output),
            IndexCommands::Show => commands::index::show(&store, output),
        },
        Commands::Undo => commands::undo::undo(&mut store, output),
        Commands::Last => commands::undo::last(&store, output),
        // Handled above
        Commands::Config { .. }
        | Commands::Pause
        | Commands::Resume
        | Commands::Abort
        | Commands::Status => unreachable!(),
    }
}

fn sessions(config: &Config) -> SessionStore {
    SessionStore::new(config.session_path())
}

/// Send log output to stderr, filtered by `TIMI_LOG` / `log_level`
fn init_logging(config: &Config) {
    let log_level = config.log_level.as_deref().unwrap_or("warn");
    let env_filter = if log_level.contains('=') {
        EnvFilter::new(log_level)
    } else {
        EnvFilter::new(format!("timi_core={},timi={}", log_level, log_level))
    };

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_store_error_found_through_context() {
        let err = Err::<(), _>(StoreError::NoActiveSession)
            .context("Failed to stop session")
            .unwrap_err();

        let store_err = find_store_error(&err);
        assert!(matches!(store_err, Some(StoreError::NoActiveSession)));
        assert_eq!(
            store_err.and_then(StoreError::recovery_suggestion),
            Some("Start one with `timi start`.")
        );
        assert_eq!(exit_status(store_err), 2);
    }

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(None), 1);
        assert_eq!(exit_status(Some(&StoreError::SessionPaused)), 1);
        assert_eq!(exit_status(Some(&StoreError::NoUndoAvailable)), 2);

        let plain = anyhow::anyhow!("No fields to change");
        assert!(find_store_error(&plain).is_none());
    }

    #[test]
    fn test_cli_parses_session_and_batch_commands() {
        let cli = Cli::try_parse_from(["timi", "stop", "--type", "work", "--tags", "a,b"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Stop(SessionArgs { activity_type: Some(ref t), .. }) if t == "work"
        ));

        let cli = Cli::try_parse_from(["timi", "batch", "add", "--file", "rows.csv"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Batch { command: BatchCommands::Add { ref file } } if file == &PathBuf::from("rows.csv")
        ));

        let cli = Cli::try_parse_from(["timi", "ls", "--meta-tag", "deep"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::List { meta_tag: Some(ref m), .. } if m == "deep"
        ));
    }
}
