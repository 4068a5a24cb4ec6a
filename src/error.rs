//! Error types shared by the store, storage backends and command handlers.

use std::fmt;

/// Which collection an id was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Task,
    Project,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Task => f.write_str("task"),
            Entity::Project => f.write_str("project"),
        }
    }
}

/// Failures of the durable key-value storage.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The record could not be read or written.
    #[error("storage key '{key}' is inaccessible: {source}")]
    Io {
        key: String,
        source: std::io::Error,
    },

    /// The record exists but does not decode.
    #[error("storage key '{key}' holds corrupt data: {source}")]
    Corrupt {
        key: String,
        source: serde_json::Error,
    },

    /// A collection could not be encoded for writing.
    #[error("failed to encode '{key}': {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
}

/// Errors raised by store operations.
///
/// Validation and guard errors abort the mutation before anything changes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required field is empty or malformed.
    #[error("{0}")]
    Validation(String),

    /// The referenced id does not exist.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: Entity, id: String },

    /// A project still has sub-projects.
    #[error("project '{id}' has {count} sub-project(s); delete them first")]
    HasChildren { id: String, count: usize },

    /// A project is still referenced by tasks.
    #[error("project '{id}' has {count} task(s); move or delete them first")]
    HasTasks { id: String, count: usize },

    /// Re-parenting would make a project its own ancestor.
    #[error("moving project '{id}' under '{parent_id}' would create a cycle")]
    CycleDetected { id: String, parent_id: String },

    #[error(transparent)]
    StorageUnavailable(#[from] StorageError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// File or terminal I/O outside the store (export, backup, UI).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn task_not_found(id: &str) -> Self {
        Error::NotFound { entity: Entity::Task, id: id.to_string() }
    }

    pub(crate) fn project_not_found(id: &str) -> Self {
        Error::NotFound { entity: Entity::Project, id: id.to_string() }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
