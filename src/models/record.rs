//! File records, users and the whole store state

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// A reference to one externally stored file
///
/// Records are appended to categories and never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Identifies the stored content in the delivery system
    pub message_id: i64,

    /// Type tag, e.g. "photo" or "document"
    pub file_type: String,

    /// Original file name, when the sender supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl FileRecord {
    /// Create a record without a file name
    pub fn new(message_id: i64, file_type: impl Into<String>) -> Self {
        Self {
            message_id,
            file_type: file_type.into(),
            file_name: None,
        }
    }

    /// Create a record with an optional file name
    ///
    /// An empty name is treated as absent so it is never stored.
    pub fn with_name(
        message_id: i64,
        file_type: impl Into<String>,
        file_name: Option<impl Into<String>>,
    ) -> Self {
        let file_name = file_name.map(Into::into).filter(|n: &String| !n.is_empty());
        Self {
            message_id,
            file_type: file_type.into(),
            file_name,
        }
    }
}

impl fmt::Display for FileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file_name {
            Some(name) => write!(f, "{} #{} ({})", self.file_type, self.message_id, name),
            None => write!(f, "{} #{}", self.file_type, self.message_id),
        }
    }
}

/// A user's categories, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<FileRecord>>,
}

/// Every user in the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub users: BTreeMap<String, UserRecord>,
}

impl StoreState {
    /// Flatten into snapshot form
    pub fn to_snapshots(&self) -> Vec<UserSnapshot> {
        self.users
            .iter()
            .map(|(user_id, record)| UserSnapshot {
                user_id: user_id.clone(),
                categories: record.categories.clone(),
            })
            .collect()
    }

    /// Build a state from snapshot records; later duplicates of a user id win
    pub fn from_snapshots(users: Vec<UserSnapshot>) -> Self {
        let users = users
            .into_iter()
            .map(|u| {
                (
                    u.user_id,
                    UserRecord {
                        categories: u.categories,
                    },
                )
            })
            .collect();
        Self { users }
    }

    /// Total number of file records across all users
    pub fn file_count(&self) -> usize {
        self.users
            .values()
            .flat_map(|u| u.categories.values())
            .map(Vec::len)
            .sum()
    }
}

/// One user as it appears in a backup snapshot or a remote document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub user_id: String,
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<FileRecord>>,
}

/// Normalize a numeric user id to its storage key
pub fn user_key(user_id: i64) -> String {
    user_id.to_string()
}

/// Validate a category name before it is created or appended to
///
/// Only the empty name is rejected. Backends that cannot store a name
/// verbatim are responsible for encoding it.
pub fn validate_category_name(name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::Validation("category name cannot be empty".into()));
    }
    Ok(())
}
