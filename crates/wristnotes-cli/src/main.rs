//! wristnotes CLI - mirror Apple Notes into a local store
//!
//! `wristnotes sync` drives the Notes app through `osascript`; the other
//! commands only read the local copy.

mod cli;
mod commands;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::{resolve_config_path, resolve_db_path};
use crate::commands::list::run_list;
use crate::commands::show::run_show;
use crate::commands::sync::run_sync;
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

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wristnotes=info")),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Sync => {
            let config_path = resolve_config_path(cli.config);
            run_sync(&db_path, &config_path).await?;
        }
        Commands::List { limit, json } => run_list(limit, json, &db_path)?,
        Commands::Show { id, json } => run_show(&id, json, &db_path)?,
    }

    Ok(())
}
