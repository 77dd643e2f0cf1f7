use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::collections::HashMap;
use vinyl_core::model::{Play, Track, TrackId};
use vinyl_core::AsyncCatalog;

use super::print_json;

pub async fn play(
    catalog: &AsyncCatalog,
    track: i64,
    at: Option<DateTime<Utc>>,
    json: bool,
) -> Result<()> {
    let play = catalog
        .record_play(TrackId::from_raw(track), at)
        .await
        .with_context(|| format!("Failed to record play of track {}", track))?;

    if json {
        return print_json(&play);
    }
    println!("✓ Play {} at {}", play.id, local_time(play.listened_at));
    Ok(())
}

#[derive(Debug, Serialize)]
struct RecentPlay {
    #[serde(flatten)]
    play: Play,
    title: Option<String>,
}

pub async fn recent(
    catalog: &AsyncCatalog,
    limit: usize,
    before: Option<DateTime<Utc>>,
    json: bool,
) -> Result<()> {
    let rows = catalog
        .run(move |store| {
            let plays = store.recent_plays(limit, before)?;
            let titles = titles_for(store, plays.iter().map(|p| p.track_id))?;
            Ok(plays
                .into_iter()
                .map(|play| RecentPlay {
                    title: titles.get(&play.track_id).cloned(),
                    play,
                })
                .collect::<Vec<_>>())
        })
        .await?;

    if json {
        return print_json(&rows);
    }
    for row in &rows {
        println!(
            "{}  {:>6}  {}",
            local_time(row.play.listened_at),
            row.play.track_id,
            row.title.as_deref().unwrap_or("?")
        );
    }
    Ok(())
}

pub async fn counts(
    catalog: &AsyncCatalog,
    since: Option<DateTime<Utc>>,
    json: bool,
) -> Result<()> {
    let counts = catalog.play_counts(since).await?;
    if json {
        return print_json(&counts);
    }
    let ids: Vec<TrackId> = counts.iter().map(|c| c.track_id).collect();
    let titles = catalog.run(move |store| titles_for(store, ids)).await?;
    for count in &counts {
        println!(
            "{:>6}  {:>6}  {}",
            count.plays,
            count.track_id,
            titles.get(&count.track_id).map_or("?", String::as_str)
        );
    }
    Ok(())
}

fn titles_for(
    store: &vinyl_core::CatalogStore,
    ids: impl IntoIterator<Item = TrackId>,
) -> vinyl_core::Result<HashMap<TrackId, String>> {
    let mut titles = HashMap::new();
    for id in ids {
        if titles.contains_key(&id) {
            continue;
        }
        if let Some(Track { title, .. }) = store.get_track(id)? {
            titles.insert(id, title);
        }
    }
    Ok(titles)
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
