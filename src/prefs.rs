//! Cross-session preferences such as the active theme.
//!
//! Stored separately from the dataset in a small JSON key-value file and
//! written with the same temp-file-and-rename discipline.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::db::storage::atomic_write;
use crate::error::{Error, Result};

pub const THEME_KEY: &str = "theme";
pub const DEFAULT_THEME: &str = "light";

const PREFS_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PreferencesFile {
    schema_version: u32,
    #[serde(default)]
    values: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct Preferences {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl Preferences {
    /// Open the preferences file, starting empty when it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(content) => {
                let file: PreferencesFile = serde_json::from_str(&content)
                    .map_err(|e| Error::corrupt(&path, format!("malformed JSON: {e}")))?;
                if file.schema_version != PREFS_VERSION {
                    return Err(Error::corrupt(
                        &path,
                        format!(
                            "unsupported schema version {} (expected {PREFS_VERSION})",
                            file.schema_version
                        ),
                    ));
                }
                file.values
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(Error::io(&path, e)),
        };

        tracing::debug!("Loaded {} preferences from {}", values.len(), path.display());
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored value for `key`, or `default` when unset.
    pub fn get(&self, key: &str, default: &str) -> String {
        self.values
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// Store a value and persist immediately. On failure the old value is kept.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let previous = self.values.insert(key.to_string(), value.into());
        if let Err(e) = self.persist() {
            match previous {
                Some(old) => self.values.insert(key.to_string(), old),
                None => self.values.remove(key),
            };
            return Err(e);
        }
        tracing::info!("Preference `{}` updated", key);
        Ok(())
    }

    /// Remove a value and persist immediately. Returns whether it was set.
    pub fn remove(&mut self, key: &str) -> Result<bool> {
        let Some(previous) = self.values.remove(key) else {
            return Ok(false);
        };
        if let Err(e) = self.persist() {
            self.values.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(true)
    }

    pub fn theme(&self) -> String {
        self.get(THEME_KEY, DEFAULT_THEME)
    }

    pub fn set_theme(&mut self, theme: &str) -> Result<()> {
        let theme = theme.trim();
        if theme.is_empty() {
            return Err(Error::validation("theme", "cannot be empty"));
        }
        self.set(THEME_KEY, theme)
    }

    fn persist(&self) -> Result<()> {
        let file = PreferencesFile {
            schema_version: PREFS_VERSION,
            values: self.values.clone(),
        };
        let json = serde_json::to_vec_pretty(&file)
            .map_err(|e| Error::io(&self.path, io::Error::new(io::ErrorKind::InvalidData, e)))?;
        atomic_write(&self.path, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_defaults_to_light() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Preferences::open(dir.path().join("preferences.json")).unwrap();
        assert_eq!(prefs.theme(), DEFAULT_THEME);
    }

    #[test]
    fn blank_theme_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = Preferences::open(dir.path().join("preferences.json")).unwrap();
        let err = prefs.set_theme("   ").unwrap_err();
        assert!(matches!(err, Error::Validation { field: "theme", .. }));
    }

    #[test]
    fn failed_write_keeps_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        let mut prefs = Preferences::open(&path).unwrap();
        prefs.set("theme", "dark").unwrap();

        // A directory at the target path makes the rename fail.
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();
        fs::write(path.join("blocker"), "x").unwrap();

        assert!(prefs.set("theme", "solarized").is_err());
        assert_eq!(prefs.theme(), "dark");
    }
}
