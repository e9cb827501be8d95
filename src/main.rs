use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use filestash::cli::{
    handle_backup, handle_category_command, handle_health, handle_list, handle_restore,
    BackupArgs, CategoryCommands, ListArgs, RestoreArgs, StoreArgs,
};
use filestash::storage::open_store;

#[derive(Parser)]
#[command(
    name = "filestash",
    version,
    about = "Per-user file category store: backup, restore and inspection",
    long_about = "filestash manages the store behind a file-keeping bot. It creates \
                  and prunes snapshots, restores them, reports backend health, and \
                  lets you inspect or repair a user's categories by hand."
)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a snapshot of the whole store
    Backup(BackupArgs),

    /// Replace the store with a snapshot
    Restore(RestoreArgs),

    /// List existing snapshots
    List(ListArgs),

    /// Print backend health as JSON
    Health,

    /// Category management commands
    #[command(subcommand)]
    Category(CategoryCommands),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "filestash=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let settings = cli.store.to_settings();

    match cli.command {
        Commands::List(args) => {
            handle_list(&args.backup_dir, settings.backend.backup_prefix())?;
        }
        Commands::Health => {
            if !handle_health(&settings) {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Backup(args) => {
            let store = open_store(&settings)?;
            handle_backup(store.as_ref(), &args)?;
            store.close()?;
        }
        Commands::Restore(args) => {
            let store = open_store(&settings)?;
            handle_restore(store.as_ref(), &args)?;
            store.close()?;
        }
        Commands::Category(cmd) => {
            let store = open_store(&settings)?;
            handle_category_command(store.as_ref(), cmd)?;
            store.close()?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
