//! Configuration for the `taskflow` binary.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`<config dir>/taskflow/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Weekday;
use serde::Deserialize;

use crate::format::parse_weekday;
use crate::storage::{sanitize_key, StoreKeys};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A value is present but not usable.
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    /// Neither a data directory nor a home directory could be found.
    #[error("could not determine a data directory; pass --data-dir")]
    NoDataDir,
}

/// Top-level TOML config file structure.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    log_level: Option<String>,
    storage: StorageFileConfig,
    calendar: CalendarFileConfig,
    ui: UiFileConfig,
}

/// `[storage]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    tasks_key: Option<String>,
    projects_key: Option<String>,
}

/// `[calendar]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CalendarFileConfig {
    week_starts_on: Option<String>,
}

/// `[ui]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UiFileConfig {
    log_file: Option<PathBuf>,
}

/// Values the command line may override.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding one JSON file per storage key.
    pub data_dir: PathBuf,
    /// Default `tracing` filter; `RUST_LOG` still wins.
    pub log_level: String,
    pub keys: StoreKeys,
    /// First column of the weekly and monthly calendar.
    pub week_start: Weekday,
    /// Log file used while the terminal UI owns the screen.
    pub log_file: PathBuf,
}

impl Config {
    /// Defaults rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Config {
            log_file: data_dir.join("taskflow.log"),
            data_dir,
            log_level: "warn".to_string(),
            keys: StoreKeys::default(),
            week_start: Weekday::Sun,
        }
    }

    /// Load the config file and merge the command-line overrides into it.
    pub fn load(overrides: &Overrides) -> Result<Self, ConfigError> {
        let file = load_config_file(overrides.config.as_deref())?;
        let base = match overrides.data_dir.clone().or_else(|| file.data_dir.clone()) {
            Some(dir) => dir,
            None => default_data_dir().ok_or(ConfigError::NoDataDir)?,
        };
        Self::resolve(base, overrides, file)
    }

    /// Parse a config file's text and merge `overrides` into it. Used where
    /// the file contents come from somewhere other than disk.
    pub fn from_toml(text: &str, overrides: &Overrides) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        let base = overrides
            .data_dir
            .clone()
            .or_else(|| file.data_dir.clone())
            .ok_or(ConfigError::NoDataDir)?;
        Self::resolve(base, overrides, file)
    }

    /// Priority: CLI > file > default.
    fn resolve(data_dir: PathBuf, overrides: &Overrides, file: ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::with_data_dir(data_dir);
        let week_start = match file.calendar.week_starts_on {
            Some(raw) => parse_week_start(&raw)?,
            None => defaults.week_start,
        };
        let keys = StoreKeys {
            tasks: checked_key("storage.tasks_key", file.storage.tasks_key)?
                .unwrap_or(defaults.keys.tasks),
            projects: checked_key("storage.projects_key", file.storage.projects_key)?
                .unwrap_or(defaults.keys.projects),
        };
        // Both keys must map to distinct files.
        if sanitize_key(&keys.tasks) == sanitize_key(&keys.projects) {
            return Err(ConfigError::InvalidValue { key: "storage.projects_key", value: keys.projects });
        }

        Ok(Config {
            log_level: overrides
                .log_level
                .clone()
                .or(file.log_level)
                .unwrap_or(defaults.log_level),
            keys,
            week_start,
            log_file: file.ui.log_file.unwrap_or(defaults.log_file),
            data_dir: defaults.data_dir,
        })
    }
}

/// Week start names accepted in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekStart(pub Weekday);

impl FromStr for WeekStart {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_weekday(s).map(WeekStart).ok_or_else(|| ConfigError::InvalidValue {
            key: "calendar.week_starts_on",
            value: s.to_string(),
        })
    }
}

fn parse_week_start(raw: &str) -> Result<Weekday, ConfigError> {
    raw.parse::<WeekStart>().map(|w| w.0)
}

fn checked_key(key: &'static str, value: Option<String>) -> Result<Option<String>, ConfigError> {
    match value {
        Some(v) if v.trim().is_empty() => Err(ConfigError::InvalidValue { key, value: v }),
        other => Ok(other),
    }
}

/// `<data dir>/taskflow`, falling back to `~/.taskflow`.
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir()
        .map(|d| d.join("taskflow"))
        .or_else(|| dirs::home_dir().map(|h| h.join(".taskflow")))
}

/// Default location of the config file, if a config directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("taskflow").join("config.toml"))
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p)
            .map_err(|source| ConfigError::ReadFile { path: p.to_path_buf(), source })?;
        return Ok(toml::from_str(&contents)?);
    }
    let Some(path) = default_config_path() else {
        return Ok(ConfigFile::default());
    };
    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(source) => Err(ConfigError::ReadFile { path, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(dir: &str) -> Overrides {
        Overrides { data_dir: Some(PathBuf::from(dir)), ..Default::default() }
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("", &at("/data")).unwrap();
        assert_eq!(config, Config::with_data_dir("/data"));
        assert_eq!(config.keys.tasks, "tasks");
        assert_eq!(config.keys.projects, "projects");
        assert_eq!(config.week_start, Weekday::Sun);
        assert_eq!(config.log_file, PathBuf::from("/data/taskflow.log"));
    }

    #[test]
    fn test_toml_parsing_full() {
        let toml_str = r#"
data_dir = "/from/file"
log_level = "debug"

[storage]
tasks_key = "taskflow-tasks"
projects_key = "taskflow-projects"

[calendar]
week_starts_on = "monday"

[ui]
log_file = "/tmp/tf.log"
"#;
        let config = Config::from_toml(toml_str, &Overrides::default()).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/from/file"));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.keys.tasks, "taskflow-tasks");
        assert_eq!(config.keys.projects, "taskflow-projects");
        assert_eq!(config.week_start, Weekday::Mon);
        assert_eq!(config.log_file, PathBuf::from("/tmp/tf.log"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let overrides = Overrides {
            data_dir: Some("/cli".into()),
            log_level: Some("trace".into()),
            config: None,
        };
        let config = Config::from_toml("data_dir = \"/file\"\nlog_level = \"info\"", &overrides).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/cli"));
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_toml("[calendar]\nweek_starts_on = \"someday\"", &at("/d")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "calendar.week_starts_on", .. }));
        let err = Config::from_toml("[storage]\ntasks_key = \" \"", &at("/d")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        let err = Config::from_toml("[storage]\nprojects_key = \"tasks\"", &at("/d")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        let colliding = "[storage]\ntasks_key = \"my-data\"\nprojects_key = \"My Data\"";
        let err = Config::from_toml(colliding, &at("/d")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "storage.projects_key", .. }));
        assert!(matches!(Config::from_toml("log_level = 3", &at("/d")), Err(ConfigError::ParseToml(_))));
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = Overrides {
            config: Some(dir.path().join("missing.toml")),
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        assert!(matches!(Config::load(&overrides), Err(ConfigError::ReadFile { .. })));

        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[calendar]\nweek_starts_on = \"sat\"\n").unwrap();
        let overrides = Overrides { config: Some(path), ..overrides };
        let config = Config::load(&overrides).unwrap();
        assert_eq!(config.week_start, Weekday::Sat);
        assert_eq!(config.data_dir, dir.path());
    }
}
