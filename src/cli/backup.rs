//! Backup CLI commands
//!
//! `backup`, `restore` and `list`.

use std::path::{Path, PathBuf};

use clap::Args;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::backup::{BackupInfo, BackupManager, RestoreManager, DEFAULT_MAX_BACKUPS};
use crate::error::{StoreError, StoreResult};
use crate::storage::CategoryStore;

/// Default directory for snapshot files
pub const DEFAULT_BACKUP_DIR: &str = "data";

#[derive(Args, Debug, Clone)]
pub struct BackupArgs {
    /// Directory to store backups
    #[arg(long, env = "FILESTASH_BACKUP_DIR", default_value = DEFAULT_BACKUP_DIR)]
    pub backup_dir: PathBuf,

    /// Maximum number of backups to keep (0 keeps all)
    #[arg(long, default_value_t = DEFAULT_MAX_BACKUPS, allow_negative_numbers = true)]
    pub max_backups: i64,
}

#[derive(Args, Debug, Clone)]
pub struct RestoreArgs {
    /// Directory holding backups
    #[arg(long, env = "FILESTASH_BACKUP_DIR", default_value = DEFAULT_BACKUP_DIR)]
    pub backup_dir: PathBuf,

    /// Specific backup file to restore from (defaults to the latest)
    #[arg(long)]
    pub backup_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Directory holding backups
    #[arg(long, env = "FILESTASH_BACKUP_DIR", default_value = DEFAULT_BACKUP_DIR)]
    pub backup_dir: PathBuf,
}

/// Create a snapshot of `store`
pub fn handle_backup(store: &dyn CategoryStore, args: &BackupArgs) -> StoreResult<PathBuf> {
    let manager =
        BackupManager::new(&args.backup_dir, args.max_backups).with_prefix(store.backup_prefix());

    let backup_path = manager.create_backup(store)?;
    println!("Created backup: {}", backup_path.display());
    Ok(backup_path)
}

/// Restore `store` from the given or the latest snapshot
pub fn handle_restore(store: &dyn CategoryStore, args: &RestoreArgs) -> StoreResult<()> {
    let manager =
        BackupManager::new(&args.backup_dir, DEFAULT_MAX_BACKUPS).with_prefix(store.backup_prefix());

    let backup_path = match &args.backup_file {
        Some(path) => path.clone(),
        None => manager
            .latest_backup()?
            .ok_or_else(|| StoreError::backup_not_found(args.backup_dir.display().to_string()))?,
    };

    println!("Restoring from: {}", backup_path.display());

    let result = RestoreManager::new(&manager).restore_from_file(store, &backup_path)?;

    if let Some(safety) = &result.safety_backup {
        println!("Backup of previous data: {}", safety.display());
    }
    println!("{}", result.summary());
    Ok(())
}

#[derive(Tabled)]
struct BackupRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Modified")]
    modified: String,
}

impl From<&BackupInfo> for BackupRow {
    fn from(info: &BackupInfo) -> Self {
        Self {
            file: info.filename.clone(),
            size: format_size(info.size_bytes),
            modified: info
                .modified_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        }
    }
}

/// Print the snapshots in a directory, oldest first
pub fn handle_list(backup_dir: &Path, prefix: &str) -> StoreResult<()> {
    let manager = BackupManager::new(backup_dir, 0).with_prefix(prefix);
    let backups = manager.list_backups()?;

    if backups.is_empty() {
        println!("No backup files found in {}", backup_dir.display());
        return Ok(());
    }

    println!("Found {} backup(s):", backups.len());
    let rows: Vec<BackupRow> = backups.iter().map(BackupRow::from).collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
    Ok(())
}

/// Format a file size in human-readable form
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
