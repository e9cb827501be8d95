//! Core data models for filestash
//!
//! - [`FileRecord`]: one stored file reference
//! - [`UserRecord`]: a user's named categories
//! - [`StoreState`]: every user, the unit of backup and restore
//! - [`Page`]: a paginated slice of a category

pub mod page;
pub mod record;

pub use page::{paginate, Page};
pub use record::{
    user_key, validate_category_name, FileRecord, StoreState, UserRecord, UserSnapshot,
};
