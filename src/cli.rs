use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;
use crate::config::Overrides;

/// Task and project manager with calendar views and a terminal UI.
/// Data lives in one JSON file per collection under the data directory.
#[derive(Parser)]
#[command(name = "taskflow", version, about = "Task and project manager for the terminal")]
pub struct Cli {
    /// Directory holding the task and project files.
    #[arg(long, global = true, env = "TASKFLOW_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to config file (default: `<config dir>/taskflow/config.toml`).
    #[arg(long, global = true, env = "TASKFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, global = true, env = "TASKFLOW_LOG")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config: self.config.clone(),
            data_dir: self.data_dir.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;
    use crate::fields::{GroupKey, Priority, SortKey, StatusFilter};

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_list_options() {
        let cli = Cli::parse_from([
            "taskflow", "list", "--status", "in-progress", "--sort", "due-date", "--group", "priority",
            "--data-dir", "/tmp/tf",
        ]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/tf")));
        match cli.command {
            Commands::List { status, sort, group, .. } => {
                assert_eq!(status, StatusFilter::InProgress);
                assert_eq!(sort, SortKey::DueDate);
                assert_eq!(group, GroupKey::Priority);
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn test_parse_add_defaults() {
        let cli = Cli::parse_from(["taskflow", "add", "Write report", "--priority", "urgent"]);
        match cli.command {
            Commands::Add { title, priority, due, project, .. } => {
                assert_eq!(title, "Write report");
                assert_eq!(priority, Priority::Urgent);
                assert!(due.is_none() && project.is_none());
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_parse_completions_with_overrides() {
        let cli = Cli::parse_from(["taskflow", "completions", "zsh", "--data-dir", "/tmp/tf"]);
        assert_eq!(cli.overrides().data_dir, Some(PathBuf::from("/tmp/tf")));
        assert!(matches!(cli.command, Commands::Completions { shell: clap_complete::Shell::Zsh }));
    }
}
