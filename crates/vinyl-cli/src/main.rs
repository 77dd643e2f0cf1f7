use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod cli;
mod commands;
mod config;
mod logging;

use cli::{Cli, Commands, ConfigCommand};
use config::Config;
use vinyl_core::AsyncCatalog;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config commands work without a database or logger.
    if let Commands::Config { command } = cli.command {
        return run_config(command);
    }

    let config = Config::load_with_db_path(cli.db)?;
    logging::init(&config.logging, cli.verbose)?;
    log::debug!("Using catalog at {}", config.database_path.display());

    let catalog = open_catalog(&config).await?;
    commands::dispatch(&catalog, cli.command, cli.json).await
}

async fn open_catalog(config: &Config) -> Result<AsyncCatalog> {
    let path: PathBuf = config.database_path.clone();
    let catalog = AsyncCatalog::open(path, config.store.clone())
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to open catalog at {}: {}",
                config.database_path.display(),
                e
            )
        })?;
    Ok(catalog)
}

fn run_config(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => commands::config::show_config(),
        ConfigCommand::Path => commands::config::show_path(),
        ConfigCommand::Example => commands::config::show_example(),
        ConfigCommand::Init => commands::config::init_config(),
        ConfigCommand::Set { key, value } => commands::config::set_config(&key, &value),
    }
}
