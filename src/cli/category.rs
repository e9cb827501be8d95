//! Category CLI commands
//!
//! Operate a user's categories directly, mostly for inspection and repair.

use clap::Subcommand;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::error::StoreResult;
use crate::models::FileRecord;
use crate::storage::CategoryStore;

/// Category subcommands
#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    /// List a user's categories
    List {
        /// User id
        user: i64,
    },

    /// Append a file record to a category
    Add {
        /// User id
        user: i64,
        /// Category name
        category: String,
        /// Message id of the stored file
        message_id: i64,
        /// File type tag, e.g. photo or document
        #[arg(short = 't', long, default_value = "document")]
        file_type: String,
        /// Original file name
        #[arg(short = 'n', long)]
        name: Option<String>,
    },

    /// Show the files in a category, one page at a time
    Files {
        /// User id
        user: i64,
        /// Category name
        category: String,
        /// Page number (clamped to the available pages)
        #[arg(short, long, default_value_t = 1)]
        page: usize,
        /// Files per page
        #[arg(long, default_value_t = 5)]
        page_size: usize,
    },

    /// Create an empty category
    Create {
        /// User id
        user: i64,
        /// Category name
        category: String,
    },

    /// Delete a category and its file records
    Delete {
        /// User id
        user: i64,
        /// Category name
        category: String,
    },
}

#[derive(Tabled)]
struct FileRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Message")]
    message_id: i64,
    #[tabled(rename = "Type")]
    file_type: String,
    #[tabled(rename = "Name")]
    name: String,
}

/// Handle a category command
pub fn handle_category_command(store: &dyn CategoryStore, cmd: CategoryCommands) -> StoreResult<()> {
    match cmd {
        CategoryCommands::List { user } => {
            let categories = store.user_categories(user)?;
            if categories.is_empty() {
                println!("No categories for user {}.", user);
            } else {
                for name in categories {
                    println!("{}", name);
                }
            }
        }

        CategoryCommands::Add {
            user,
            category,
            message_id,
            file_type,
            name,
        } => {
            let record = FileRecord::with_name(message_id, file_type, name);
            store.add_file_to_category(user, &category, record.clone())?;
            println!("Added {} to '{}'", record, category);
        }

        CategoryCommands::Files {
            user,
            category,
            page,
            page_size,
        } => {
            let page = store.files_in_category_paginated(user, &category, page, page_size)?;

            if page.total_files == 0 {
                println!("No files in '{}'.", category);
                return Ok(());
            }

            let offset = (page.page - 1) * page_size.max(1);
            let rows: Vec<FileRow> = page
                .files
                .iter()
                .enumerate()
                .map(|(i, f)| FileRow {
                    index: offset + i + 1,
                    message_id: f.message_id,
                    file_type: f.file_type.clone(),
                    name: f.file_name.clone().unwrap_or_default(),
                })
                .collect();

            println!("{}", Table::new(rows).with(Style::rounded()));
            println!(
                "Page {}/{} ({} file(s))",
                page.page, page.total_pages, page.total_files
            );
        }

        CategoryCommands::Create { user, category } => {
            store.create_category(user, &category)?;
            println!("Category '{}' is ready", category);
        }

        CategoryCommands::Delete { user, category } => {
            if store.delete_category(user, &category)? {
                println!("Deleted category '{}'", category);
            } else {
                println!("Category '{}' does not exist", category);
            }
        }
    }

    Ok(())
}
