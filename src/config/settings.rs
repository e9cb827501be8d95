//! Store settings
//!
//! Chooses the persistence backend and carries everything needed to open it.
//! The remote connection string has no default: it is required external
//! configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Default state file for the local backend
pub const DEFAULT_DB_FILE: &str = "store_bot_db.json";

/// Default database name for the remote backend
pub const DEFAULT_MONGO_DB: &str = "telegram_storage_bot";

/// Default bound on a single backend call
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Which persistence backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Single JSON file, written atomically
    #[default]
    Local,
    /// MongoDB, one document per user
    Mongo,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Mongo => "mongo",
        }
    }

    /// Snapshot filename prefix, matching `mongodb_backup_*` files from earlier deployments
    pub fn backup_prefix(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Mongo => "mongodb",
        }
    }
}

/// Settings used to open a store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Backend to open
    #[serde(default)]
    pub backend: BackendKind,

    /// State file for the local backend
    #[serde(default = "default_db_file")]
    pub db_file: PathBuf,

    /// Connection string for the remote backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mongo_uri: Option<String>,

    /// Database name for the remote backend
    #[serde(default = "default_mongo_db")]
    pub mongo_db: String,

    /// Upper bound on connection and server selection for a backend call
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub operation_timeout: Duration,
}

fn default_db_file() -> PathBuf {
    PathBuf::from(DEFAULT_DB_FILE)
}

fn default_mongo_db() -> String {
    DEFAULT_MONGO_DB.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(DEFAULT_TIMEOUT_SECS)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            db_file: default_db_file(),
            mongo_uri: None,
            mongo_db: default_mongo_db(),
            operation_timeout: default_timeout(),
        }
    }
}

impl Settings {
    /// Settings for a local store at `db_file`
    pub fn local(db_file: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::Local,
            db_file: db_file.into(),
            ..Self::default()
        }
    }

    /// Settings for a remote store
    pub fn mongo(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            backend: BackendKind::Mongo,
            mongo_uri: Some(uri.into()),
            mongo_db: database.into(),
            ..Self::default()
        }
    }

    /// Check that the settings are sufficient to open the chosen backend
    pub fn validate(&self) -> StoreResult<()> {
        if self.operation_timeout.is_zero() {
            return Err(StoreError::Config(
                "operation timeout must be greater than zero".into(),
            ));
        }

        match self.backend {
            BackendKind::Local => {
                if self.db_file.as_os_str().is_empty() {
                    return Err(StoreError::Config("state file path is empty".into()));
                }
            }
            BackendKind::Mongo => {
                let uri = self.mongo_uri.as_deref().map(str::trim).unwrap_or("");
                if uri.is_empty() {
                    return Err(StoreError::ConnectionUnavailable(
                        "MONGO_URI is not configured".into(),
                    ));
                }
                if self.mongo_db.trim().is_empty() {
                    return Err(StoreError::Config("database name is empty".into()));
                }
            }
        }

        Ok(())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.backend, BackendKind::Local);
        assert_eq!(settings.db_file, PathBuf::from("store_bot_db.json"));
        assert!(settings.mongo_uri.is_none());
        assert_eq!(settings.operation_timeout, Duration::from_secs(5));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_mongo_without_uri_fails_fast() {
        let settings = Settings {
            backend: BackendKind::Mongo,
            ..Settings::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.is_connection_unavailable());

        let blank = Settings {
            backend: BackendKind::Mongo,
            mongo_uri: Some("   ".into()),
            ..Settings::default()
        };
        assert!(blank.validate().unwrap_err().is_connection_unavailable());
    }

    #[test]
    fn test_mongo_with_uri_is_valid() {
        let settings = Settings::mongo("mongodb://localhost:27017", "bot");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_backup_prefix() {
        assert_eq!(BackendKind::Local.backup_prefix(), "local");
        assert_eq!(BackendKind::Mongo.backup_prefix(), "mongodb");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut settings = Settings::local("db.json");
        settings.operation_timeout = Duration::ZERO;
        assert!(matches!(settings.validate(), Err(StoreError::Config(_))));
    }

    #[test]
    fn test_serde_round_trip() {
        let json = r#"{"backend": "mongo", "mongo_uri": "mongodb://h", "operation_timeout": 9}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.backend, BackendKind::Mongo);
        assert_eq!(settings.mongo_db, DEFAULT_MONGO_DB);
        assert_eq!(settings.operation_timeout, Duration::from_secs(9));

        let back = serde_json::to_string(&settings).unwrap();
        assert!(back.contains("\"operation_timeout\":9"));
    }
}
