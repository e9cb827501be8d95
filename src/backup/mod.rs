//! Backup system for filestash
//!
//! Provides whole-store snapshots with count-based retention, and restore
//! with a safety snapshot of the state being replaced.
//!
//! # Backup Format
//!
//! ```text
//! {"users": [{"user_id": "123", "categories": {"docs": [{"message_id": 1, "file_type": "document"}]}}]}
//! ```
//!
//! Files are named `<prefix>_backup_<YYYYmmdd_HHMMSS>.json`, where the
//! prefix is the store's [`backup_prefix`](crate::storage::CategoryStore::backup_prefix),
//! so sorting by filename sorts by age. Safety backups taken before a
//! restore use `<prefix>_pre_restore` and never mix with regular ones.
//!
//! # Example
//!
//! ```rust,ignore
//! use filestash::backup::{BackupManager, RestoreManager};
//!
//! let backups = BackupManager::new("data", 10).with_prefix(store.backup_prefix());
//! let path = backups.create_backup(store.as_ref())?;
//!
//! let result = RestoreManager::new(&backups).restore_from_file(store.as_ref(), &path)?;
//! println!("{}", result.summary());
//! ```

mod manager;
mod restore;

pub use manager::{
    backup_files, find_latest_backup, BackupInfo, BackupManager, SnapshotArchive,
    DEFAULT_MAX_BACKUPS,
};
pub use restore::{
    RestoreManager, RestoreResult, ValidationResult, SAFETY_BACKUP_RETENTION, SAFETY_BACKUP_SUFFIX,
};
