//! inksync CLI - drive the note sync engine from the terminal
//!
//! Pull handwriting notes into a local cache, inspect them, and push local
//! changes back through the versioned merge-and-retry pipeline.

mod cli;
mod commands;
mod config;
mod error;


use std::path::Path;

use clap::Parser;
use inksync_core::SyncConfig;

use crate::cli::{Cli, Commands};
use crate::commands::common::{note_key, resolve_db_path};
use crate::commands::config::run_config;
use crate::commands::export::run_export;
use crate::commands::import::run_import;
use crate::commands::pull::run_pull;
use crate::commands::push::run_push;
use crate::commands::show::{run_list, run_show};
use crate::commands::status::run_status;
use crate::config::CliConfig;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive = "inksync=info"
        .parse()
        .map_err(|error| CliError::Config(format!("invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Config { command } => run_config(command),
        command => {
            let config = CliConfig::load()?;
            let sync_config =
                config.effective_sync_config(|name| std::env::var(name).ok(), cli.server_url)?;
            let db_path = resolve_db_path(cli.db_path, &config)?;
            run_note_command(command, &sync_config, &db_path).await
        }
    }
}

async fn run_note_command(
    command: Commands,
    sync_config: &SyncConfig,
    db_path: &Path,
) -> Result<(), CliError> {
    match command {
        Commands::Status { json } => run_status(sync_config, db_path, json).await,
        Commands::List { json } => run_list(db_path, json).await,
        Commands::Show { book, record, json } => {
            run_show(&note_key(&book, &record)?, db_path, json).await
        }
        Commands::Pull {
            book,
            record,
            force,
        } => run_pull(&note_key(&book, &record)?, force, sync_config, db_path).await,
        Commands::Push { book, record } => {
            run_push(&note_key(&book, &record)?, sync_config, db_path).await
        }
        Commands::Import { path, book, record } => {
            run_import(&path, book.as_deref(), record.as_deref(), db_path).await
        }
        Commands::Export {
            book,
            record,
            output,
        } => run_export(&note_key(&book, &record)?, output.as_deref(), db_path).await,
        Commands::Config { command } => run_config(command),
    }
}
