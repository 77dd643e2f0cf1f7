//! Async facade over [`CatalogStore`].
//!
//! SQLite calls block, so each operation runs on tokio's blocking pool.
//! Concurrent calls are safe: writes serialize on the store's writer and
//! reads fan out over its reader pool.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;

use crate::catalog::{CatalogCounts, CatalogStore, LinkOutcome};
use crate::error::{Error, Result};
use crate::model::{AlbumId, Artist, ArtistId, Cover, Credit, Play, PlayCount, Track, TrackId};
use crate::schema::{CascadeReport, StoreOptions};
use crate::stats::PeriodStats;

#[derive(Debug, Clone)]
pub struct AsyncCatalog {
    store: Arc<CatalogStore>,
}

impl AsyncCatalog {
    pub const fn new(store: Arc<CatalogStore>) -> Self {
        Self { store }
    }

    /// Open (and migrate) the catalog at `path` off the async runtime.
    pub async fn open(path: PathBuf, options: StoreOptions) -> Result<Self> {
        let store = tokio::task::spawn_blocking(move || CatalogStore::open(path, &options))
            .await
            .map_err(|e| Error::Worker(e.to_string()))??;
        Ok(Self::new(Arc::new(store)))
    }

    /// The shared store, for synchronous callers.
    #[must_use]
    pub fn store(&self) -> &Arc<CatalogStore> {
        &self.store
    }

    /// Run `f` against the store on the blocking pool.
    pub async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&CatalogStore) -> Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| {
                log::error!("Catalog task failed: {e}");
                Error::Worker(e.to_string())
            })?
    }

    pub async fn add_track(
        &self,
        title: String,
        duration_ms: i64,
        artists: Vec<String>,
        album: Option<String>,
    ) -> Result<TrackId> {
        self.run(move |store| store.add_track(&title, duration_ms, &artists, album.as_deref()))
            .await
    }

    pub async fn upsert_artist(&self, name: String) -> Result<ArtistId> {
        self.run(move |store| store.upsert_artist(&name)).await
    }

    pub async fn upsert_album(&self, name: String, cover: Option<Cover>) -> Result<AlbumId> {
        self.run(move |store| store.upsert_album(&name, cover.as_ref()))
            .await
    }

    pub async fn upsert_track(
        &self,
        title: String,
        duration_ms: i64,
        album: Option<String>,
    ) -> Result<TrackId> {
        self.run(move |store| store.upsert_track(&title, duration_ms, album.as_deref()))
            .await
    }

    pub async fn link_track_artist(
        &self,
        track: TrackId,
        artist: ArtistId,
        role: Option<String>,
    ) -> Result<LinkOutcome> {
        self.run(move |store| store.link_track_artist(track, artist, role.as_deref()))
            .await
    }

    pub async fn link_track_album(&self, track: TrackId, album: AlbumId) -> Result<LinkOutcome> {
        self.run(move |store| store.link_track_album(track, album))
            .await
    }

    pub async fn record_play(
        &self,
        track: TrackId,
        listened_at: Option<DateTime<Utc>>,
    ) -> Result<Play> {
        self.run(move |store| store.record_play(track, listened_at))
            .await
    }

    pub async fn recent_plays(
        &self,
        limit: usize,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<Play>> {
        self.run(move |store| store.recent_plays(limit, before))
            .await
    }

    pub async fn play_counts(&self, since: Option<DateTime<Utc>>) -> Result<Vec<PlayCount>> {
        self.run(move |store| store.play_counts(since)).await
    }

    pub async fn get_track(&self, track: TrackId) -> Result<Option<Track>> {
        self.run(move |store| store.get_track(track)).await
    }

    pub async fn artists_for_track(&self, track: TrackId) -> Result<Vec<Credit>> {
        self.run(move |store| store.artists_for_track(track))
            .await
    }

    pub async fn list_artists(&self) -> Result<Vec<Artist>> {
        self.run(CatalogStore::list_artists).await
    }

    pub async fn search_tracks(&self, query: String) -> Result<Vec<Track>> {
        self.run(move |store| store.search_tracks(&query)).await
    }

    pub async fn period_stats(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        top_n: usize,
    ) -> Result<PeriodStats> {
        self.run(move |store| store.period_stats(from, to, top_n))
            .await
    }

    pub async fn remove_track(&self, track: TrackId) -> Result<Option<CascadeReport>> {
        self.run(move |store| store.remove_track(track)).await
    }

    pub async fn remove_artist(&self, artist: ArtistId) -> Result<Option<CascadeReport>> {
        self.run(move |store| store.remove_artist(artist)).await
    }

    pub async fn remove_album(&self, album: AlbumId) -> Result<Option<CascadeReport>> {
        self.run(move |store| store.remove_album(album)).await
    }

    pub async fn catalog_counts(&self) -> Result<CatalogCounts> {
        self.run(CatalogStore::catalog_counts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn catalog() -> AsyncCatalog {
        AsyncCatalog::new(Arc::new(CatalogStore::open_in_memory().unwrap()))
    }

    #[tokio::test]
    async fn test_add_and_play() {
        let catalog = catalog();
        let track = catalog
            .add_track(
                "Hyperballad".to_string(),
                321_000,
                vec!["Björk".to_string()],
                Some("Post".to_string()),
            )
            .await
            .unwrap();
        let play = catalog.record_play(track, None).await.unwrap();

        let recent = catalog.recent_plays(5, None).await.unwrap();
        assert_eq!(recent, vec![play]);
        assert_eq!(catalog.artists_for_track(track).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let catalog = catalog();
        let err = catalog
            .record_play(TrackId::from_raw(99), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DanglingReference);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_resolve_to_one_row() {
        let catalog = catalog();
        let names = ["Portishead", "PORTISHEAD", "portishead", "Portishead "];
        let handles: Vec<_> = names
            .iter()
            .map(|name| {
                let catalog = catalog.clone();
                let name = (*name).to_string();
                tokio::spawn(async move { catalog.upsert_artist(name).await })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(catalog.catalog_counts().await.unwrap().artists, 1);
    }
}
