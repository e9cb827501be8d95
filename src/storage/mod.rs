//! Storage layer for filestash
//!
//! One contract, [`CategoryStore`], with two backends:
//!
//! - [`LocalFileStore`]: a single JSON file, rewritten atomically on every
//!   mutation
//! - [`MongoStore`]: one MongoDB document per user, mutated with atomic
//!   server-side update operators
//!
//! Callers are written once against the trait; [`open_store`] picks the
//! backend from [`Settings`].

pub mod file_io;
pub mod local;
pub mod locks;
pub mod mongo;

pub use file_io::{quarantine, read_json, write_json_atomic};
pub use local::LocalFileStore;
pub use locks::UserLocks;
pub use mongo::MongoStore;

use tracing::info;

use crate::config::{BackendKind, Settings};
use crate::error::StoreResult;
use crate::health::Liveness;
use crate::models::{paginate, FileRecord, Page, UserSnapshot};

/// Per-user category persistence
///
/// Absence is never an error: unknown users and categories read as empty.
/// Errors mean the backend itself failed.
pub trait CategoryStore: Send + Sync {
    /// Short backend name used in logs and health output
    fn backend_name(&self) -> &'static str;

    /// Filename prefix for this backend's snapshots
    fn backup_prefix(&self) -> &'static str {
        self.backend_name()
    }

    /// Category names for a user, creating an empty user record if unseen
    fn user_categories(&self, user_id: i64) -> StoreResult<Vec<String>>;

    /// Append a record, creating the user and category as needed
    fn add_file_to_category(&self, user_id: i64, category: &str, record: FileRecord)
        -> StoreResult<()>;

    /// All records in a category, in insertion order
    fn files_in_category(&self, user_id: i64, category: &str) -> StoreResult<Vec<FileRecord>>;

    /// One page of a category; out-of-range pages clamp
    fn files_in_category_paginated(
        &self,
        user_id: i64,
        category: &str,
        page: usize,
        page_size: usize,
    ) -> StoreResult<Page> {
        let files = self.files_in_category(user_id, category)?;
        Ok(paginate(files, page, page_size))
    }

    /// Create an empty category; a no-op if it already exists
    fn create_category(&self, user_id: i64, category: &str) -> StoreResult<()>;

    /// Remove a category, returning whether it existed
    fn delete_category(&self, user_id: i64, category: &str) -> StoreResult<bool>;

    /// Report whether the backend answers, without mutating anything
    fn liveness_check(&self) -> Liveness;

    /// Dump every user for a snapshot
    fn export_users(&self) -> StoreResult<Vec<UserSnapshot>>;

    /// Replace the whole store with `users`
    fn replace_all(&self, users: Vec<UserSnapshot>) -> StoreResult<()>;

    /// Release the backend connection
    fn close(self: Box<Self>) -> StoreResult<()>;
}

/// Open the backend selected by `settings`
pub fn open_store(settings: &Settings) -> StoreResult<Box<dyn CategoryStore>> {
    settings.validate()?;

    info!(backend = settings.backend.as_str(), "Opening store");

    match settings.backend {
        BackendKind::Local => Ok(Box::new(LocalFileStore::open(&settings.db_file)?)),
        BackendKind::Mongo => Ok(Box::new(MongoStore::connect(settings)?)),
    }
}
