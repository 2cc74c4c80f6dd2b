//! Location of the files ProjectDesk keeps on disk.
//!
//! Everything lives under one data directory:
//! - `dataset.json` - projects, tasks, members and documents
//! - `preferences.json` - cross-session settings such as the theme
//! - `backups/` - timestamped dataset snapshots
//!
//! The directory is `$PROJECTDESK_DATA_DIR` when set, otherwise the platform
//! data directory (e.g. `~/.local/share/projectdesk` on Linux).

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "PROJECTDESK_DATA_DIR";

const APP_NAME: &str = "projectdesk";
const DATASET_FILE: &str = "dataset.json";
const PREFERENCES_FILE: &str = "preferences.json";
const BACKUP_DIR: &str = "backups";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    data_dir: PathBuf,
}

impl DataPaths {
    /// Resolve the data directory from the environment or the platform defaults.
    pub fn resolve() -> Result<Self> {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::in_dir(PathBuf::from(dir)));
        }

        let dirs = directories::ProjectDirs::from("", "", APP_NAME).ok_or(Error::NoDataDir)?;
        Ok(Self::in_dir(dirs.data_dir()))
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn dataset_file(&self) -> PathBuf {
        self.data_dir.join(DATASET_FILE)
    }

    pub fn preferences_file(&self) -> PathBuf {
        self.data_dir.join(PREFERENCES_FILE)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.data_dir.join(BACKUP_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_live_under_the_data_dir() {
        let paths = DataPaths::in_dir("/tmp/pd");
        assert_eq!(paths.dataset_file(), PathBuf::from("/tmp/pd/dataset.json"));
        assert_eq!(
            paths.preferences_file(),
            PathBuf::from("/tmp/pd/preferences.json")
        );
        assert_eq!(paths.backup_dir(), PathBuf::from("/tmp/pd/backups"));
    }
}
