//! Folder-based backups of a single profile.
//!
//! A backup is a copy of every entry of the profile folder except `backups/` itself,
//! stored as `backups/<name>/`. Restoring replaces the profile contents with the copy.

use crate::{
    core::{
        folder::{clear_dir_except, copy_dir_all},
        profile::{BACKUPS_DIR, CONFIG_FILE, ProfileManager},
    },
    errors::{Error, Result},
};
use chrono::Local;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Format of generated backup names; sorts chronologically
pub const BACKUP_NAME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// A backup folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    /// Folder name
    pub name: String,
    /// Full path of the folder
    pub path: PathBuf,
}

/// Backup operations on one profile folder.
#[derive(Debug, Clone)]
pub struct BackupManager {
    profile_dir: PathBuf,
}

impl BackupManager {
    /// Manager for the profile stored in `profile_dir`.
    pub fn new(profile_dir: impl Into<PathBuf>) -> Self {
        Self {
            profile_dir: profile_dir.into(),
        }
    }

    /// The `backups/` folder of the profile
    #[must_use]
    pub fn backups_dir(&self) -> PathBuf {
        self.profile_dir.join(BACKUPS_DIR)
    }

    fn backup_path(&self, name: &str) -> PathBuf {
        self.backups_dir().join(name)
    }

    fn require_existing(&self, name: &str) -> Result<(String, PathBuf)> {
        let name = ProfileManager::validate_profile_name(name)?;
        let path = self.backup_path(&name);
        if !path.is_dir() {
            return Err(Error::NotFound {
                entity: "backup",
                key: name,
            });
        }
        Ok((name, path))
    }

    fn require_free(&self, name: &str) -> Result<(String, PathBuf)> {
        let name = ProfileManager::validate_profile_name(name)?;
        let path = self.backup_path(&name);
        if path.exists() {
            return Err(Error::Conflict {
                entity: "backup",
                key: name,
            });
        }
        Ok((name, path))
    }

    /// Backups containing a profile configuration, sorted by name.
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        let dir = self.backups_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        for entry in fs::read_dir(&dir).map_err(Error::io_at(&dir))? {
            let entry = entry.map_err(Error::io_at(&dir))?;
            let path = entry.path();
            if !path.join(CONFIG_FILE).is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                backups.push(BackupInfo {
                    name: name.to_string(),
                    path,
                });
            }
        }
        backups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(backups)
    }

    /// Copies the profile into a new backup named `name`, or after the current local time.
    ///
    /// # Errors
    /// Returns [`Error::Conflict`] if the backup exists. A failed copy removes the partial
    /// backup before returning the error.
    #[instrument(skip(self))]
    pub fn create_backup(&self, name: Option<&str>) -> Result<BackupInfo> {
        let name = name.map_or_else(
            || Local::now().format(BACKUP_NAME_FORMAT).to_string(),
            str::to_string,
        );
        let (name, path) = self.require_free(&name)?;

        match copy_dir_all(&self.profile_dir, &path, &[BACKUPS_DIR]) {
            Ok(files) => {
                info!("Created backup {name} ({files} files)");
                Ok(BackupInfo { name, path })
            }
            Err(e) => {
                remove_partial(&path);
                Err(e)
            }
        }
    }

    /// Replaces the profile contents (except `backups/`) with backup `name`.
    ///
    /// The current state is not saved first. The caller must close the profile database
    /// before restoring.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if the backup does not exist and
    /// [`Error::LockedResource`] if a profile file is held open elsewhere.
    #[instrument(skip(self))]
    pub fn restore_backup(&self, name: &str) -> Result<()> {
        let (name, path) = self.require_existing(name)?;

        clear_dir_except(&self.profile_dir, &[BACKUPS_DIR])?;
        let files = copy_dir_all(&path, &self.profile_dir, &[])?;
        info!("Restored backup {name} ({files} files)");
        Ok(())
    }

    /// Deletes backup `name`.
    pub fn delete_backup(&self, name: &str) -> Result<()> {
        let (name, path) = self.require_existing(name)?;
        fs::remove_dir_all(&path).map_err(Error::io_at(&path))?;
        info!("Deleted backup {name}");
        Ok(())
    }

    /// Renames backup `old` to `new`. Renaming to the same name does nothing.
    pub fn rename_backup(&self, old: &str, new: &str) -> Result<BackupInfo> {
        let (old, old_path) = self.require_existing(old)?;
        if ProfileManager::validate_profile_name(new)? == old {
            return Ok(BackupInfo {
                name: old,
                path: old_path,
            });
        }
        let (new, new_path) = self.require_free(new)?;

        fs::rename(&old_path, &new_path).map_err(Error::io_at(&old_path))?;
        info!("Renamed backup {old} to {new}");
        Ok(BackupInfo {
            name: new,
            path: new_path,
        })
    }

    /// Copies backup `src` to a new backup `dst`.
    pub fn duplicate_backup(&self, src: &str, dst: &str) -> Result<BackupInfo> {
        let (src, src_path) = self.require_existing(src)?;
        let (dst, dst_path) = self.require_free(dst)?;

        if let Err(e) = copy_dir_all(&src_path, &dst_path, &[]) {
            remove_partial(&dst_path);
            return Err(e);
        }
        info!("Duplicated backup {src} to {dst}");
        Ok(BackupInfo {
            name: dst,
            path: dst_path,
        })
    }
}

fn remove_partial(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_dir_all(path) {
            warn!("Failed to remove partial backup {}: {e}", path.display());
        }
    }
}
