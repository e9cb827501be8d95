//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the store and backup layers.

pub mod backup;
pub mod category;
pub mod health;

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::config::settings::{
    BackendKind, Settings, DEFAULT_DB_FILE, DEFAULT_MONGO_DB, DEFAULT_TIMEOUT_SECS,
};

pub use backup::{handle_backup, handle_list, handle_restore, BackupArgs, ListArgs, RestoreArgs};
pub use category::{handle_category_command, CategoryCommands};
pub use health::handle_health;

/// Options selecting and configuring the store backend
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Persistence backend
    #[arg(long, env = "FILESTASH_BACKEND", value_enum, default_value_t = BackendKind::Local, global = true)]
    pub backend: BackendKind,

    /// State file for the local backend
    #[arg(long, env = "FILESTASH_DB_FILE", default_value = DEFAULT_DB_FILE, global = true)]
    pub db_file: PathBuf,

    /// MongoDB connection string (required for the mongo backend)
    #[arg(long, env = "MONGO_URI", hide_env_values = true, global = true)]
    pub mongo_uri: Option<String>,

    /// MongoDB database name
    #[arg(long, env = "MONGO_DB_NAME", default_value = DEFAULT_MONGO_DB, global = true)]
    pub mongo_db: String,

    /// Timeout in seconds for reaching the backend
    #[arg(long, env = "FILESTASH_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    pub timeout_secs: u64,
}

impl StoreArgs {
    pub fn to_settings(&self) -> Settings {
        Settings {
            backend: self.backend,
            db_file: self.db_file.clone(),
            mongo_uri: self.mongo_uri.clone(),
            mongo_db: self.mongo_db.clone(),
            operation_timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}
