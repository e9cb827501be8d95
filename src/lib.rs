//! filestash - per-user categorized file-reference store
//!
//! Keeps, for every user, named categories of file references, persisted
//! either in a single atomically-written JSON file or in MongoDB, with
//! whole-store backup and restore.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Backend selection and connection settings
//! - `error`: Custom error types
//! - `models`: File records, users, pagination
//! - `storage`: The `CategoryStore` trait and its two backends
//! - `backup`: Snapshots, retention, restore
//! - `health`: Liveness reporting for probes
//! - `cli`: Command handlers for the `filestash` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use filestash::config::Settings;
//! use filestash::models::FileRecord;
//! use filestash::storage::open_store;
//!
//! let store = open_store(&Settings::local("store_bot_db.json"))?;
//! store.add_file_to_category(42, "Receipts", FileRecord::new(1001, "photo"))?;
//! let page = store.files_in_category_paginated(42, "Receipts", 1, 5)?;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod health;
pub mod models;
pub mod storage;

pub use error::{StoreError, StoreResult};
pub use storage::{open_store, CategoryStore};
