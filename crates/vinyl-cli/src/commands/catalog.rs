use anyhow::{Context, Result};
use serde::Serialize;
use vinyl_core::model::{Album, AlbumId, Artist, ArtistId, Credit, Play, Track, TrackId};
use vinyl_core::{AsyncCatalog, CascadeReport, LinkOutcome};

use super::print_json;
use crate::cli::{CoverCommand, LinkCommand, RemoveCommand, UnlinkCommand};

pub async fn add(
    catalog: &AsyncCatalog,
    title: String,
    duration_ms: i64,
    artists: Vec<String>,
    album: Option<String>,
    json: bool,
) -> Result<()> {
    let track = catalog
        .add_track(title, duration_ms, artists, album)
        .await
        .context("Failed to add track")?;

    if json {
        return print_json(&serde_json::json!({ "track": track }));
    }
    println!("✓ Track {}", track);
    Ok(())
}

pub async fn link(catalog: &AsyncCatalog, cmd: LinkCommand, json: bool) -> Result<()> {
    let outcome = match cmd {
        LinkCommand::Artist {
            track,
            artist,
            role,
        } => {
            catalog
                .link_track_artist(TrackId::from_raw(track), ArtistId::from_raw(artist), role)
                .await?
        }
        LinkCommand::Album { track, album } => {
            catalog
                .link_track_album(TrackId::from_raw(track), AlbumId::from_raw(album))
                .await?
        }
    };

    if json {
        return print_json(&serde_json::json!({ "outcome": outcome }));
    }
    let message = match outcome {
        LinkOutcome::Created => "linked",
        LinkOutcome::Unchanged => "already linked",
        LinkOutcome::RoleReplaced => "role replaced",
    };
    println!("✓ {}", message);
    Ok(())
}

pub async fn unlink(catalog: &AsyncCatalog, cmd: UnlinkCommand, json: bool) -> Result<()> {
    let removed = match cmd {
        UnlinkCommand::Artist { track, artist } => {
            catalog
                .run(move |store| {
                    store.unlink_track_artist(TrackId::from_raw(track), ArtistId::from_raw(artist))
                })
                .await?
        }
        UnlinkCommand::Album { track, album } => {
            catalog
                .run(move |store| {
                    store.unlink_track_album(TrackId::from_raw(track), AlbumId::from_raw(album))
                })
                .await?
        }
    };

    if json {
        return print_json(&serde_json::json!({ "removed": removed }));
    }
    println!("{}", if removed { "✓ unlinked" } else { "nothing to unlink" });
    Ok(())
}

pub async fn remove(catalog: &AsyncCatalog, cmd: RemoveCommand, json: bool) -> Result<()> {
    let report = match cmd {
        RemoveCommand::Track { id } => catalog.remove_track(TrackId::from_raw(id)).await?,
        RemoveCommand::Artist { id } => catalog.remove_artist(ArtistId::from_raw(id)).await?,
        RemoveCommand::Album { id } => catalog.remove_album(AlbumId::from_raw(id)).await?,
    };

    if json {
        return print_json(&report);
    }
    match report {
        Some(report) => print_report(&report),
        None => println!("Nothing to remove"),
    }
    Ok(())
}

fn print_report(report: &CascadeReport) {
    println!("✓ Removed {} {}", report.endpoint.table(), report.uid);
    if report.track_artists > 0 {
        println!("  credits: {}", report.track_artists);
    }
    if report.track_albums > 0 {
        println!("  album links: {}", report.track_albums);
    }
    if report.plays > 0 {
        println!("  plays: {}", report.plays);
    }
}

pub async fn cover(catalog: &AsyncCatalog, cmd: CoverCommand, json: bool) -> Result<()> {
    match cmd {
        CoverCommand::Set { album, file } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let mime = catalog
                .run(move |store| {
                    let cover = store.cover_from_bytes(data)?;
                    store.set_album_cover(AlbumId::from_raw(album), Some(&cover))?;
                    Ok(cover.mime_type().to_string())
                })
                .await?;
            if json {
                return print_json(&serde_json::json!({ "album": album, "mime": mime }));
            }
            println!("✓ Cover set ({})", mime);
        }
        CoverCommand::Export { album, out } => {
            let cover = catalog
                .run(move |store| store.album_cover(AlbumId::from_raw(album)))
                .await?
                .with_context(|| format!("Album {} has no cover", album))?;
            tokio::fs::write(&out, cover.data())
                .await
                .with_context(|| format!("Failed to write {}", out.display()))?;
            if json {
                return print_json(&serde_json::json!({
                    "album": album,
                    "mime": cover.mime_type(),
                    "bytes": cover.len(),
                }));
            }
            println!("✓ Wrote {} bytes to {}", cover.len(), out.display());
        }
        CoverCommand::Clear { album } => {
            catalog
                .run(move |store| store.set_album_cover(AlbumId::from_raw(album), None))
                .await?;
            if json {
                return print_json(&serde_json::json!({ "album": album, "cleared": true }));
            }
            println!("✓ Cover cleared");
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct TrackDetails {
    track: Track,
    credits: Vec<Credit>,
    albums: Vec<Album>,
    recent_plays: Vec<Play>,
}

pub async fn show(catalog: &AsyncCatalog, track: i64, json: bool) -> Result<()> {
    let id = TrackId::from_raw(track);
    let details = catalog
        .run(move |store| {
            let Some(track) = store.get_track(id)? else {
                return Ok(None);
            };
            Ok(Some(TrackDetails {
                track,
                credits: store.artists_for_track(id)?,
                albums: store.albums_for_track(id)?,
                recent_plays: store.history_for_track(id, 5)?,
            }))
        })
        .await?
        .with_context(|| format!("No track with id {}", track))?;

    if json {
        return print_json(&details);
    }
    println!(
        "{}  {} [{}]",
        details.track.id,
        details.track.title,
        details.track.display_duration()
    );
    for credit in &details.credits {
        println!("  artist: {} ({}, {})", credit.artist.name, credit.artist.id, credit.role);
    }
    for album in &details.albums {
        println!("  album:  {} ({})", album.name, album.id);
    }
    for play in &details.recent_plays {
        println!("  played: {}", play.listened_at.to_rfc3339());
    }
    Ok(())
}

pub async fn tracks(
    catalog: &AsyncCatalog,
    query: Option<String>,
    artist: Option<i64>,
    album: Option<i64>,
    json: bool,
) -> Result<()> {
    let tracks = catalog
        .run(move |store| match (query, artist, album) {
            (Some(query), _, _) => store.search_tracks(&query),
            (None, Some(artist), _) => store.tracks_for_artist(ArtistId::from_raw(artist)),
            (None, None, Some(album)) => store.tracks_for_album(AlbumId::from_raw(album)),
            (None, None, None) => store.list_tracks(),
        })
        .await?;

    if json {
        return print_json(&tracks);
    }
    for track in &tracks {
        println!("{:>6}  {} [{}]", track.id, track.title, track.display_duration());
    }
    Ok(())
}

pub async fn artists(catalog: &AsyncCatalog, json: bool) -> Result<()> {
    let artists: Vec<Artist> = catalog.list_artists().await?;
    if json {
        return print_json(&artists);
    }
    for artist in &artists {
        println!("{:>6}  {}", artist.id, artist.name);
    }
    Ok(())
}

pub async fn albums(catalog: &AsyncCatalog, json: bool) -> Result<()> {
    let albums = catalog.run(|store| store.list_albums()).await?;
    if json {
        return print_json(&albums);
    }
    for album in &albums {
        let marker = if album.has_cover { " [cover]" } else { "" };
        println!("{:>6}  {}{}", album.id, album.name, marker);
    }
    Ok(())
}

pub async fn status(catalog: &AsyncCatalog, json: bool) -> Result<()> {
    let counts = catalog.catalog_counts().await?;
    if json {
        return print_json(&counts);
    }
    println!("\nVinyl Status\n");
    println!("  Artists: {}", counts.artists);
    println!("  Albums:  {}", counts.albums);
    println!("  Tracks:  {}", counts.tracks);
    println!("  Plays:   {}", counts.plays);
    Ok(())
}
