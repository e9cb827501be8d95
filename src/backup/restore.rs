//! Backup restoration for filestash
//!
//! Restore is a full replace: the store ends up holding exactly what the
//! snapshot holds, whatever was there before.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{StoreError, StoreResult};
use crate::storage::CategoryStore;

use super::manager::{BackupManager, SnapshotArchive};

/// Snapshots kept when taking the pre-restore safety backup
pub const SAFETY_BACKUP_RETENTION: i64 = 5;

/// Appended to the regular prefix for pre-restore safety backups
pub const SAFETY_BACKUP_SUFFIX: &str = "pre_restore";

/// Handles restoring from snapshots
pub struct RestoreManager {
    /// Where pre-restore safety backups go
    safety: BackupManager,
}

impl RestoreManager {
    /// Create a new RestoreManager
    ///
    /// Safety backups go to `backups`' directory as
    /// `<prefix>_pre_restore_backup_*.json`, keeping
    /// [`SAFETY_BACKUP_RETENTION`] of them. Regular snapshots are never
    /// pruned by a restore.
    pub fn new(backups: &BackupManager) -> Self {
        let prefix = format!("{}_{}", backups.prefix(), SAFETY_BACKUP_SUFFIX);
        Self {
            safety: backups
                .with_max_backups(SAFETY_BACKUP_RETENTION)
                .with_prefix(prefix),
        }
    }

    /// Read and validate a snapshot without applying it
    pub fn load_archive(&self, backup_path: &Path) -> StoreResult<SnapshotArchive> {
        if !backup_path.is_file() {
            return Err(StoreError::InvalidFormat(format!(
                "Backup file {} does not exist",
                backup_path.display()
            )));
        }

        let contents = fs::read_to_string(backup_path).map_err(|e| {
            StoreError::InvalidFormat(format!("Failed to read {}: {}", backup_path.display(), e))
        })?;

        let value: serde_json::Value = serde_json::from_str(&contents).map_err(|e| {
            StoreError::InvalidFormat(format!(
                "{} is not valid JSON: {}",
                backup_path.display(),
                e
            ))
        })?;

        if !value.get("users").is_some_and(|u| u.is_array()) {
            return Err(StoreError::InvalidFormat(format!(
                "{} has no \"users\" list",
                backup_path.display()
            )));
        }

        let archive: SnapshotArchive = serde_json::from_value(value).map_err(|e| {
            StoreError::InvalidFormat(format!(
                "{} has malformed user records: {}",
                backup_path.display(),
                e
            ))
        })?;

        check_users(&archive).map_err(|reason| {
            StoreError::InvalidFormat(format!("{}: {}", backup_path.display(), reason))
        })?;

        Ok(archive)
    }

    /// Validate a backup file without restoring it
    pub fn validate_backup(&self, backup_path: &Path) -> StoreResult<ValidationResult> {
        let archive = self.load_archive(backup_path)?;

        Ok(ValidationResult {
            path: backup_path.to_path_buf(),
            user_count: archive.users.len(),
            category_count: archive.category_count(),
            file_count: archive.file_count(),
        })
    }

    /// Replace the store contents with a snapshot
    ///
    /// The snapshot is validated before anything is touched. A safety backup
    /// of the current state is attempted first; if that fails the restore
    /// still goes ahead.
    pub fn restore_from_file(
        &self,
        store: &dyn CategoryStore,
        backup_path: &Path,
    ) -> StoreResult<RestoreResult> {
        let archive = self.load_archive(backup_path)?;

        let safety_backup = match self.safety.create_backup(store) {
            Ok(path) => {
                info!(path = %path.display(), "Created backup of current data before restore");
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, "Could not back up current data before restore");
                None
            }
        };

        let users_restored = archive.users.len();
        let categories_restored = archive.category_count();
        let files_restored = archive.file_count();

        store.replace_all(archive.users)?;

        info!(
            path = %backup_path.display(),
            users = users_restored,
            files = files_restored,
            "Restored backup"
        );

        Ok(RestoreResult {
            users_restored,
            categories_restored,
            files_restored,
            safety_backup,
        })
    }
}

/// Reject user lists no backend can hold as written
fn check_users(archive: &SnapshotArchive) -> Result<(), String> {
    let mut seen = HashSet::new();

    for user in &archive.users {
        if !seen.insert(user.user_id.as_str()) {
            return Err(format!("user {} appears more than once", user.user_id));
        }
        if user.categories.contains_key("") {
            return Err(format!("user {} has a category with an empty name", user.user_id));
        }
    }

    Ok(())
}

/// Result of a restore operation
#[derive(Debug, Default)]
pub struct RestoreResult {
    pub users_restored: usize,
    pub categories_restored: usize,
    pub files_restored: usize,
    /// Backup of the state that was replaced, if one could be taken
    pub safety_backup: Option<PathBuf>,
}

impl RestoreResult {
    /// Get a summary of what was restored
    pub fn summary(&self) -> String {
        if self.users_restored == 0 {
            return "Backup contained no user records".to_string();
        }
        format!(
            "Restored {} user record(s), {} categor{}, {} file(s)",
            self.users_restored,
            self.categories_restored,
            if self.categories_restored == 1 { "y" } else { "ies" },
            self.files_restored
        )
    }
}

/// Result of validating a backup
#[derive(Debug)]
pub struct ValidationResult {
    pub path: PathBuf,
    pub user_count: usize,
    pub category_count: usize,
    pub file_count: usize,
}

impl ValidationResult {
    pub fn summary(&self) -> String {
        format!(
            "{} user(s), {} categories, {} files",
            self.user_count, self.category_count, self.file_count
        )
    }
}
