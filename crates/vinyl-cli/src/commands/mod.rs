pub mod catalog;
pub mod config;
pub mod history;
pub mod stats;

use anyhow::{Context, Result};
use serde::Serialize;
use vinyl_core::AsyncCatalog;

use crate::cli::Commands;

/// Route a catalog subcommand. `json` switches every command to JSON output.
pub async fn dispatch(catalog: &AsyncCatalog, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Add {
            title,
            duration,
            artists,
            album,
        } => catalog::add(catalog, title, duration, artists, album, json).await,
        Commands::Link(cmd) => catalog::link(catalog, cmd, json).await,
        Commands::Unlink(cmd) => catalog::unlink(catalog, cmd, json).await,
        Commands::Remove(cmd) => catalog::remove(catalog, cmd, json).await,
        Commands::Cover(cmd) => catalog::cover(catalog, cmd, json).await,
        Commands::Show { track } => catalog::show(catalog, track, json).await,
        Commands::Tracks {
            query,
            artist,
            album,
        } => catalog::tracks(catalog, query, artist, album, json).await,
        Commands::Artists => catalog::artists(catalog, json).await,
        Commands::Albums => catalog::albums(catalog, json).await,
        Commands::Status => catalog::status(catalog, json).await,
        Commands::Play { track, at } => history::play(catalog, track, at, json).await,
        Commands::Recent { limit, before } => history::recent(catalog, limit, before, json).await,
        Commands::Counts { since } => history::counts(catalog, since, json).await,
        Commands::Stats { period, top } => stats::period(catalog, period.into(), top, json).await,
        Commands::Daily { from, days } => stats::daily(catalog, from, days, json).await,
        Commands::Config { .. } => anyhow::bail!("config commands do not use the catalog"),
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render JSON")?;
    println!("{}", rendered);
    Ok(())
}
