//! # taskflow
//!
//! Command-line entry point: parses arguments, resolves configuration,
//! starts logging, opens the store and dispatches to the command handlers.
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a task due on Friday
//! taskflow add "Write report" --priority high --due fri
//!
//! # Organise work into nested projects
//! taskflow project add Work
//! taskflow project add Reports --parent Work
//!
//! # List open tasks grouped by priority
//! taskflow list --status pending --group priority
//!
//! # Month calendar, or the interactive UI
//! taskflow calendar --view month
//! taskflow ui
//! ```
//!
//! Data is stored in the platform data directory (`~/.local/share/taskflow`
//! on Linux) unless `--data-dir` or `TASKFLOW_DATA_DIR` says otherwise.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use taskflow::cli::Cli;
use taskflow::cmd::*;
use taskflow::config::Config;
use taskflow::storage::FileStorage;
use taskflow::store::{Collection, Store};
use taskflow::Result;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(&cli.overrides())?;
    let _guard = match cli.command {
        Commands::Ui => init_file_logging(&config.log_level, &config.log_file),
        _ => {
            init_stderr_logging(&config.log_level);
            None
        }
    };
    tracing::debug!(data_dir = %config.data_dir.display(), "configuration loaded");

    let storage = FileStorage::new(&config.data_dir);
    let mut store = Store::open(storage, config.keys.clone());

    match cli.command {
        Commands::Ui => cmd_ui(&mut store, &config)?,
        Commands::Add { title, desc, priority, status, due, project } => {
            cmd_add(&mut store, &config, title, desc, priority, status, due, project)?
        }
        Commands::List { status, search, project, sort, group, limit } => {
            cmd_list(&store, status, search, project, sort, group, limit)?
        }
        Commands::View { id } => cmd_view(&store, id)?,
        Commands::Update {
            id,
            title,
            desc,
            priority,
            status,
            due,
            clear_due,
            project,
            clear_project,
        } => {
            cmd_update(
                &mut store, &config, id, title, desc, priority, status, due, clear_due, project,
                clear_project,
            )?
        }
        Commands::Toggle { id } => cmd_toggle(&mut store, id)?,
        Commands::Delete { id } => cmd_delete(&mut store, id)?,
        Commands::Move { id, target } => cmd_move(&mut store, id, target)?,
        Commands::Project { action } => cmd_project(&mut store, action)?,
        Commands::Calendar { view, date } => cmd_calendar(&store, &config, view, date)?,
        Commands::Export { output, status, project } => {
            cmd_export(&store, output, status, project)?
        }
        Commands::Backup => cmd_backup(store.storage(), store.keys())?,
        Commands::Completions { shell } => cmd_completions(shell),
    }

    if store.unsaved().is_empty() {
        return Ok(ExitCode::SUCCESS);
    }
    let names: Vec<&str> = store
        .unsaved()
        .iter()
        .map(|c| match c {
            Collection::Tasks => "tasks",
            Collection::Projects => "projects",
        })
        .collect();
    eprintln!(
        "Error: changes to {} could not be saved to {}",
        names.join(" and "),
        config.data_dir.display()
    );
    Ok(ExitCode::FAILURE)
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Log to stderr for one-shot commands.
fn init_stderr_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter(level))
        .with_target(false)
        .init();
}

/// Initialize file-based logging.
///
/// Logs are written to a file (never stdout, since ratatui owns the terminal).
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_file_logging(level: &str, log_path: &Path) -> Option<WorkerGuard> {
    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;
    std::fs::create_dir_all(log_dir).ok()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter(level))
        .with_ansi(false)
        .init();

    Some(guard)
}
