//! JSON file backend
//!
//! The whole [`StoreState`] lives in one file:
//!
//! ```text
//! {"users": {"<id>": {"categories": {"<name>": [{"message_id": 1, "file_type": "photo"}]}}}}
//! ```
//!
//! Mutations hold the write lock while the next state is persisted with an
//! atomic rename, and only update the in-memory copy once the file is
//! written. A failed write leaves both the file and the cache untouched.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, error, info};

use crate::error::{StoreError, StoreResult};
use crate::health::Liveness;
use crate::models::{user_key, validate_category_name, FileRecord, StoreState, UserSnapshot};

use super::file_io::{quarantine, read_json, write_json_atomic};
use super::CategoryStore;

/// Store backed by a single atomically-rewritten JSON file
#[derive(Debug)]
pub struct LocalFileStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl LocalFileStore {
    /// Open the store at `path`
    ///
    /// A missing file is initialised to an empty state. A file that fails to
    /// parse is quarantined next to the original and replaced by an empty
    /// state.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let state = match read_json::<StoreState, _>(&path) {
            Ok(Some(state)) => state,
            Ok(None) => {
                let state = StoreState::default();
                write_json_atomic(&path, &state)?;
                info!(path = %path.display(), "Initialized empty store");
                state
            }
            Err(StoreError::CorruptState { reason, .. }) => {
                let moved = quarantine(&path)?;
                error!(
                    path = %path.display(),
                    quarantined = %moved.display(),
                    reason = %reason,
                    "State file is corrupt, quarantined and reinitialized"
                );
                let state = StoreState::default();
                write_json_atomic(&path, &state)?;
                state
            }
            Err(e) => return Err(e),
        };

        info!(
            path = %path.display(),
            users = state.users.len(),
            files = state.file_count(),
            "Opened local store"
        );

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check the state file at `path` without opening a store
    ///
    /// Read-only: a missing file is not created and a corrupt one is not
    /// quarantined. A missing file counts as reachable since opening would
    /// initialize it.
    pub fn check_file(path: impl AsRef<Path>) -> Liveness {
        let path = path.as_ref();

        match read_json::<StoreState, _>(path) {
            Ok(Some(state)) => Liveness::reachable(format!(
                "state file {} ({} users)",
                path.display(),
                state.users.len()
            )),
            Ok(None) => Liveness::reachable(format!("{} not created yet", path.display())),
            Err(e) => Liveness::unreachable(e.to_string()),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> StoreResult<StoreState> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|e| StoreError::StorageUnavailable(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|e| StoreError::StorageUnavailable(format!("Failed to acquire write lock: {}", e)))
    }

    /// Apply `change` to a copy of the state, persist it, then commit
    ///
    /// `change` returns `None` when there is nothing to write.
    fn mutate<R>(&self, change: impl FnOnce(&mut StoreState) -> Option<R>) -> StoreResult<Option<R>> {
        let mut guard = self.write()?;
        let mut next = guard.clone();

        let Some(result) = change(&mut next) else {
            return Ok(None);
        };

        write_json_atomic(&self.path, &next)?;
        *guard = next;
        Ok(Some(result))
    }
}

impl CategoryStore for LocalFileStore {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    fn user_categories(&self, user_id: i64) -> StoreResult<Vec<String>> {
        let key = user_key(user_id);

        if let Some(user) = self.read()?.users.get(&key) {
            return Ok(user.categories.keys().cloned().collect());
        }

        // Unseen user: record it so it shows up in backups
        self.mutate(|state| {
            if state.users.contains_key(&key) {
                None
            } else {
                state.users.insert(key.clone(), Default::default());
                Some(())
            }
        })?;

        Ok(self
            .read()?
            .users
            .get(&key)
            .map(|u| u.categories.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn add_file_to_category(
        &self,
        user_id: i64,
        category: &str,
        record: FileRecord,
    ) -> StoreResult<()> {
        validate_category_name(category)?;
        let key = user_key(user_id);

        self.mutate(|state| {
            state
                .users
                .entry(key.clone())
                .or_default()
                .categories
                .entry(category.to_string())
                .or_default()
                .push(record);
            Some(())
        })?;

        debug!(backend = "local", user_id = %key, category, "Added file");
        Ok(())
    }

    fn files_in_category(&self, user_id: i64, category: &str) -> StoreResult<Vec<FileRecord>> {
        Ok(self
            .read()?
            .users
            .get(&user_key(user_id))
            .and_then(|u| u.categories.get(category))
            .cloned()
            .unwrap_or_default())
    }

    fn create_category(&self, user_id: i64, category: &str) -> StoreResult<()> {
        validate_category_name(category)?;
        let key = user_key(user_id);

        let created = self.mutate(|state| {
            let user = state.users.entry(key.clone()).or_default();
            if user.categories.contains_key(category) {
                None
            } else {
                user.categories.insert(category.to_string(), Vec::new());
                Some(())
            }
        })?;

        if created.is_some() {
            debug!(backend = "local", user_id = %key, category, "Created category");
        }
        Ok(())
    }

    fn delete_category(&self, user_id: i64, category: &str) -> StoreResult<bool> {
        let key = user_key(user_id);

        let deleted = self.mutate(|state| {
            state
                .users
                .get_mut(&key)
                .and_then(|u| u.categories.remove(category))
                .map(|_| ())
        })?;

        if deleted.is_some() {
            debug!(backend = "local", user_id = %key, category, "Deleted category");
        }
        Ok(deleted.is_some())
    }

    fn liveness_check(&self) -> Liveness {
        match fs::metadata(&self.path) {
            Ok(meta) if meta.is_file() => {
                Liveness::reachable(format!("state file {}", self.path.display()))
            }
            Ok(_) => Liveness::unreachable(format!("{} is not a file", self.path.display())),
            Err(e) => Liveness::unreachable(format!("{}: {}", self.path.display(), e)),
        }
    }

    fn export_users(&self) -> StoreResult<Vec<UserSnapshot>> {
        Ok(self.read()?.to_snapshots())
    }

    fn replace_all(&self, users: Vec<UserSnapshot>) -> StoreResult<()> {
        let count = users.len();
        self.mutate(move |state| {
            *state = StoreState::from_snapshots(users);
            Some(())
        })?;

        info!(backend = "local", users = count, "Replaced store contents");
        Ok(())
    }

    fn close(self: Box<Self>) -> StoreResult<()> {
        debug!(path = %self.path.display(), "Closed local store");
        Ok(())
    }
}
