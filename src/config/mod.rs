//! Configuration module for filestash
//!
//! Backend selection and connection settings. Values normally arrive from
//! command-line flags or the environment (see `main.rs`); library users can
//! build a [`Settings`] directly.

pub mod settings;

pub use settings::{BackendKind, Settings};
