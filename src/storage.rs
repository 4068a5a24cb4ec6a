//! Durable key-value storage for the task and project collections.
//!
//! Each collection is one record under its own key. The file backend keeps
//! record `k` in `<dir>/<k>.json` and writes through a temp file + rename so
//! a crash never leaves a half-written record behind.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Storage keys of the two persisted collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKeys {
    pub tasks: String,
    pub projects: String,
}

impl Default for StoreKeys {
    fn default() -> Self {
        StoreKeys { tasks: "tasks".to_string(), projects: "projects".to_string() }
    }
}

/// The read/write contract the store relies on.
pub trait Storage {
    /// Read a record. A missing record is `Ok(None)`.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace a record.
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// JSON files in a directory, one per key.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStorage { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that backs `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(buf) => Ok(Some(buf)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { key: key.to_string(), source }),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io { key: key.to_string(), source };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let path = self.path_for(key);
        // Atomic-ish write via temp + rename.
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp).map_err(io_err)?;
        f.write_all(value.as_bytes()).map_err(io_err)?;
        f.flush().map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;
        Ok(())
    }
}

/// In-process storage, mainly for tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    records: HashMap<String, String>,
    read_only: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    /// Seed a record directly, bypassing the store.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.records.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.records.get(key).map(String::as_str)
    }

    /// Make every subsequent write fail with `PermissionDenied`.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.records.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.read_only {
            return Err(StorageError::Io {
                key: key.to_string(),
                source: std::io::Error::new(ErrorKind::PermissionDenied, "storage is read-only"),
            });
        }
        self.records.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Turn a storage key into a safe file stem: lowercase alphanumerics joined
/// by single underscores.
pub fn sanitize_key(key: &str) -> String {
    let stem = key
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    if stem.is_empty() {
        "default".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("tasks"), "tasks");
        assert_eq!(sanitize_key("TaskFlow Tasks"), "taskflow_tasks");
        assert_eq!(sanitize_key("taskflow-tasks"), "taskflow_tasks");
        assert_eq!(sanitize_key("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_key("  "), "default");
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().join("nested"));
        assert!(storage.read("tasks").unwrap().is_none());
        storage.write("tasks", "[]").unwrap();
        assert_eq!(storage.read("tasks").unwrap().as_deref(), Some("[]"));
        assert!(storage.path_for("tasks").exists());
        assert!(!storage.path_for("tasks").with_extension("json.tmp").exists());
    }

    #[test]
    fn test_memory_storage_read_only() {
        let mut storage = MemoryStorage::new();
        storage.write("tasks", "[]").unwrap();
        storage.set_read_only(true);
        assert!(storage.write("tasks", "[1]").is_err());
        assert_eq!(storage.get("tasks"), Some("[]"));
    }
}
