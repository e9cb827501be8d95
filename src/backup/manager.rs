//! Backup manager for filestash
//!
//! Writes whole-store snapshots as `<prefix>_backup_<YYYYmmdd_HHMMSS>.json`
//! and prunes old ones by count. Filenames sort lexically in creation
//! order, so "newest" is always "greatest name".

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::models::UserSnapshot;
use crate::storage::{write_json_atomic, CategoryStore};

/// Default number of snapshots kept by the CLI
pub const DEFAULT_MAX_BACKUPS: i64 = 10;

const BACKUP_MARKER: &str = "_backup_";
const BACKUP_EXTENSION: &str = ".json";

/// Metadata about a backup file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupInfo {
    /// Backup filename
    pub filename: String,
    /// Full path to backup
    pub path: PathBuf,
    /// Last modification time of the file
    pub modified_at: DateTime<Utc>,
    /// Size in bytes
    pub size_bytes: u64,
}

/// Snapshot file format
///
/// Only user ids, category names and file records; no backend identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotArchive {
    pub users: Vec<UserSnapshot>,
}

impl SnapshotArchive {
    pub fn category_count(&self) -> usize {
        self.users.iter().map(|u| u.categories.len()).sum()
    }

    pub fn file_count(&self) -> usize {
        self.users
            .iter()
            .flat_map(|u| u.categories.values())
            .map(Vec::len)
            .sum()
    }
}

/// Manages snapshot creation and retention in one directory
#[derive(Debug, Clone)]
pub struct BackupManager {
    /// Path to backup directory
    backup_dir: PathBuf,
    /// Snapshots to keep; zero or negative disables pruning
    max_backups: i64,
    /// Filename prefix, normally the store's backup prefix
    prefix: String,
}

impl BackupManager {
    /// Create a new BackupManager
    pub fn new(backup_dir: impl Into<PathBuf>, max_backups: i64) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            max_backups,
            prefix: "store".to_string(),
        }
    }

    /// Use a different filename prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Same directory and prefix, different retention
    pub fn with_max_backups(&self, max_backups: i64) -> Self {
        Self {
            max_backups,
            ..self.clone()
        }
    }

    /// Get backup directory path
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn max_backups(&self) -> i64 {
        self.max_backups
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Snapshot the whole store, then enforce retention
    ///
    /// Returns the path to the created backup file.
    pub fn create_backup(&self, store: &dyn CategoryStore) -> StoreResult<PathBuf> {
        let archive = SnapshotArchive {
            users: store.export_users()?,
        };

        fs::create_dir_all(&self.backup_dir)
            .map_err(|e| StoreError::Io(format!("Failed to create backup directory: {}", e)))?;

        let backup_path = self.next_backup_path();

        // The archive is complete in memory; one atomic write puts it on disk
        write_json_atomic(&backup_path, &archive)?;

        info!(
            path = %backup_path.display(),
            users = archive.users.len(),
            files = archive.file_count(),
            "Created backup"
        );

        self.prune()?;

        Ok(backup_path)
    }

    /// Pick a filename that sorts after every existing backup from this second
    fn next_backup_path(&self) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let base = format!("{}{}{}", self.prefix, BACKUP_MARKER, stamp);

        let first = self.backup_dir.join(format!("{}{}", base, BACKUP_EXTENSION));
        if !first.exists() {
            return first;
        }

        // "_NN" sorts after ".json", keeping lexical order == creation order
        (1..)
            .map(|n| {
                self.backup_dir
                    .join(format!("{}_{:02}{}", base, n, BACKUP_EXTENSION))
            })
            .find(|p| !p.exists())
            .unwrap_or(first)
    }

    /// Delete the oldest snapshots beyond `max_backups`
    pub fn prune(&self) -> StoreResult<Vec<PathBuf>> {
        if self.max_backups <= 0 {
            return Ok(Vec::new());
        }

        let files = backup_files(&self.backup_dir, &self.prefix)?;
        let keep = self.max_backups as usize;
        let excess = files.len().saturating_sub(keep);

        let mut deleted = Vec::with_capacity(excess);
        for old in files.into_iter().take(excess) {
            fs::remove_file(&old)
                .map_err(|e| StoreError::Io(format!("Failed to delete old backup: {}", e)))?;
            debug!(path = %old.display(), "Removed old backup");
            deleted.push(old);
        }

        Ok(deleted)
    }

    /// List all available backups, oldest first
    pub fn list_backups(&self) -> StoreResult<Vec<BackupInfo>> {
        let mut backups = Vec::new();

        for path in backup_files(&self.backup_dir, &self.prefix)? {
            let metadata = fs::metadata(&path)
                .map_err(|e| StoreError::Io(format!("Failed to read backup metadata: {}", e)))?;

            let modified_at = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            backups.push(BackupInfo {
                filename: file_name_of(&path),
                path,
                modified_at,
                size_bytes: metadata.len(),
            });
        }

        Ok(backups)
    }

    /// Get the most recent backup
    pub fn latest_backup(&self) -> StoreResult<Option<PathBuf>> {
        find_latest_backup(&self.backup_dir, &self.prefix)
    }
}

/// Most recent backup in `dir` for `prefix`, by filename
pub fn find_latest_backup(dir: &Path, prefix: &str) -> StoreResult<Option<PathBuf>> {
    Ok(backup_files(dir, prefix)?.pop())
}

/// Backup files in `dir` matching `<prefix>_backup_*.json`, sorted by name
pub fn backup_files(dir: &Path, prefix: &str) -> StoreResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let marker = format!("{}{}", prefix, BACKUP_MARKER);
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)
        .map_err(|e| StoreError::Io(format!("Failed to read backup directory: {}", e)))?
    {
        let entry =
            entry.map_err(|e| StoreError::Io(format!("Failed to read directory entry: {}", e)))?;

        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with(&marker) && name.ends_with(BACKUP_EXTENSION) && entry.path().is_file()
        {
            files.push(entry.path());
        }
    }

    files.sort_by_key(|p| file_name_of(p));
    Ok(files)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
