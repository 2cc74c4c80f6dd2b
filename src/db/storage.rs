//! Durable storage for the dataset.
//!
//! # Invariants
//! - A save either replaces the whole file or leaves the previous one intact:
//!   content goes to a temporary file in the same directory, is fsynced, then
//!   renamed over the target.
//! - A missing file is a first run and loads as an empty dataset. Any other
//!   unreadable content is `StorageCorrupt`, never a silent empty dataset.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Deserialize;
use tempfile::NamedTempFile;

use super::store::{Dataset, SCHEMA_VERSION};
use crate::error::{Error, Result};

/// Reads and writes complete dataset snapshots.
pub trait Storage: Send {
    /// Load the stored dataset, or an empty one if nothing was stored yet.
    ///
    /// Only datasets that pass [`Dataset::validate`] are returned; anything
    /// else is `StorageCorrupt`.
    fn load(&self) -> Result<Dataset>;

    /// Durably replace the stored dataset.
    fn save(&self, dataset: &Dataset) -> Result<()>;

    /// Where the data lives, for diagnostics.
    fn location(&self) -> &Path;
}

/// Dataset kept in one pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for JsonFileStorage {
    fn load(&self) -> Result<Dataset> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let dir = parent_dir(&self.path);
                fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
                tracing::info!("No dataset at {}, starting empty", self.path.display());
                return Ok(Dataset::default());
            }
            Err(e) => return Err(Error::io(&self.path, e)),
        };

        let dataset = decode_dataset(&self.path, &content)?;
        tracing::debug!(
            "Loaded dataset from {}: {} projects, {} tasks, {} members, {} documents",
            self.path.display(),
            dataset.projects.len(),
            dataset.tasks.len(),
            dataset.members.len(),
            dataset.documents.len()
        );
        Ok(dataset)
    }

    fn save(&self, dataset: &Dataset) -> Result<()> {
        write_snapshot(&self.path, dataset)
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

/// Dataset kept in memory only. Useful for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    dataset: Mutex<Dataset>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing dataset instead of an empty one.
    pub fn with_dataset(dataset: Dataset) -> Self {
        Self {
            dataset: Mutex::new(dataset),
        }
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<Dataset> {
        let dataset = self.dataset.lock().expect("storage lock poisoned").clone();
        dataset
            .validate()
            .map_err(|e| Error::corrupt(self.location(), e.to_string()))?;
        Ok(dataset)
    }

    fn save(&self, dataset: &Dataset) -> Result<()> {
        *self.dataset.lock().expect("storage lock poisoned") = dataset.clone();
        Ok(())
    }

    fn location(&self) -> &Path {
        Path::new(":memory:")
    }
}

#[derive(Deserialize)]
struct VersionHeader {
    schema_version: Option<u32>,
}

/// Parse and validate dataset JSON read from `path`.
pub fn decode_dataset(path: &Path, content: &str) -> Result<Dataset> {
    let header: VersionHeader = serde_json::from_str(content)
        .map_err(|e| Error::corrupt(path, format!("malformed JSON: {e}")))?;

    match header.schema_version {
        Some(SCHEMA_VERSION) => {}
        Some(other) => {
            return Err(Error::corrupt(
                path,
                format!("unsupported schema version {other} (expected {SCHEMA_VERSION})"),
            ))
        }
        None => return Err(Error::corrupt(path, "missing schema_version")),
    }

    let dataset: Dataset = serde_json::from_str(content)
        .map_err(|e| Error::corrupt(path, format!("invalid record: {e}")))?;
    dataset
        .validate()
        .map_err(|e| Error::corrupt(path, e.to_string()))?;
    Ok(dataset)
}

/// Atomically write a dataset snapshot to `path`.
pub fn write_snapshot(path: &Path, dataset: &Dataset) -> Result<()> {
    let json = serde_json::to_vec_pretty(dataset)
        .map_err(|e| Error::io(path, io::Error::new(io::ErrorKind::InvalidData, e)))?;
    atomic_write(path, &json)
}

/// Replace `path` with `contents` through a temporary file and a rename.
pub(crate) fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    temp.write_all(contents).map_err(|e| Error::io(temp.path(), e))?;
    temp.flush().map_err(|e| Error::io(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| Error::io(temp.path(), e))?;

    // The temp file is removed on drop if the rename fails.
    temp.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_replaces_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn atomic_write_leaves_no_temporary_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        atomic_write(&path, b"{}").unwrap();
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn atomic_write_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("data.json");
        atomic_write(&path, b"{}").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn failed_rename_keeps_the_target_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("occupied");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep.txt"), "x").unwrap();

        let err = atomic_write(&target, b"data").unwrap_err();
        assert!(matches!(err, Error::StorageIo { .. }));
        assert!(target.join("keep.txt").exists());
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn decode_rejects_unknown_schema_version() {
        let err = decode_dataset(Path::new("x.json"), r#"{"schema_version": 99}"#).unwrap_err();
        assert!(matches!(err, Error::StorageCorrupt { .. }));
        assert!(err.to_string().contains("unsupported schema version 99"));
    }

    #[test]
    fn decode_accepts_minimal_dataset() {
        let dataset = decode_dataset(Path::new("x.json"), r#"{"schema_version": 1}"#).unwrap();
        assert_eq!(dataset, Dataset::default());
    }
}
