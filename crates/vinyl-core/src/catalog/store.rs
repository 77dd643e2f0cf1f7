use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::catalog::identity::{upsert_album_in, upsert_artist_in, upsert_track_in};
use crate::catalog::relations::{link_track_album_in, link_track_artist_in};
use crate::error::Result;
use crate::model::{AlbumId, ArtistId, TrackId, DEFAULT_MAX_COVER_BYTES, DEFAULT_ROLE};
use crate::schema::cascade::delete_cascading;
use crate::schema::{CascadeReport, Database, Endpoint, StoreOptions};

/// The catalog: identity tables, relationships and listening history behind
/// one transactional API.
///
/// Every public write is one transaction. Multi-step operations such as
/// [`CatalogStore::add_track`] either commit entirely or leave no trace.
/// The store is `Sync`; share it behind an `Arc` for concurrent readers.
#[derive(Debug)]
pub struct CatalogStore {
    pub(crate) db: Database,
    pub(crate) max_cover_bytes: usize,
}

/// Row counts of the main tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCounts {
    pub artists: u64,
    pub albums: u64,
    pub tracks: u64,
    pub plays: u64,
}

impl CatalogStore {
    pub fn open(path: impl AsRef<Path>, options: &StoreOptions) -> Result<Self> {
        Ok(Self {
            db: Database::open(path, options)?,
            max_cover_bytes: options.max_cover_bytes,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            db: Database::open_in_memory()?,
            max_cover_bytes: DEFAULT_MAX_COVER_BYTES,
        })
    }

    /// The underlying connections, for queries this API does not cover.
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }

    /// Add a track with its main artists and, optionally, its album.
    ///
    /// Artists and album are resolved by name (created when missing) and
    /// linked, all in one transaction.
    pub fn add_track<S: AsRef<str>>(
        &self,
        title: &str,
        duration_ms: i64,
        artist_names: &[S],
        album_name: Option<&str>,
    ) -> Result<TrackId> {
        self.db.write(|tx| {
            let track = upsert_track_in(tx, title, duration_ms, None)?;
            for name in artist_names {
                let artist = upsert_artist_in(tx, name.as_ref())?;
                link_track_artist_in(tx, track, artist, DEFAULT_ROLE)?;
            }
            if let Some(album_name) = album_name {
                let album = upsert_album_in(tx, album_name, None)?;
                link_track_album_in(tx, track, album)?;
            }
            log::info!(
                "Added track {} ({:?}, {} artists)",
                track,
                title.trim(),
                artist_names.len()
            );
            Ok(track)
        })
    }

    /// Delete a track with its credits, album links and plays.
    ///
    /// Returns `None` if the track did not exist.
    pub fn remove_track(&self, track: TrackId) -> Result<Option<CascadeReport>> {
        self.db
            .write(|tx| delete_cascading(tx, Endpoint::Track, track.raw()))
    }

    /// Delete an artist and its credits. Tracks and plays are untouched.
    pub fn remove_artist(&self, artist: ArtistId) -> Result<Option<CascadeReport>> {
        self.db
            .write(|tx| delete_cascading(tx, Endpoint::Artist, artist.raw()))
    }

    /// Delete an album and its track links. Tracks and plays are untouched.
    pub fn remove_album(&self, album: AlbumId) -> Result<Option<CascadeReport>> {
        self.db
            .write(|tx| delete_cascading(tx, Endpoint::Album, album.raw()))
    }

    pub fn catalog_counts(&self) -> Result<CatalogCounts> {
        self.db.read(|tx| {
            Ok(tx.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM artist),
                    (SELECT COUNT(*) FROM album),
                    (SELECT COUNT(*) FROM track),
                    (SELECT COUNT(*) FROM listening_history)",
                [],
                |row| {
                    Ok(CatalogCounts {
                        artists: row.get(0)?,
                        albums: row.get(1)?,
                        tracks: row.get(2)?,
                        plays: row.get(3)?,
                    })
                },
            )?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::{TimeZone, Utc};

    fn count(store: &CatalogStore, table: &str) -> i64 {
        store
            .database()
            .read(|tx| {
                Ok(tx.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?)
            })
            .unwrap()
    }

    #[test]
    fn test_add_track_links_everything() {
        let store = CatalogStore::open_in_memory().unwrap();
        let track = store
            .add_track("Song A", 200_000, &["Artist X", "Artist Z"], Some("Album Y"))
            .unwrap();

        let credits = store.artists_for_track(track).unwrap();
        assert_eq!(credits.len(), 2);
        assert!(credits.iter().all(|c| c.is_main()));
        assert_eq!(store.albums_for_track(track).unwrap()[0].name, "Album Y");
    }

    #[test]
    fn test_add_track_reuses_existing_rows() {
        let store = CatalogStore::open_in_memory().unwrap();
        let artist = store.upsert_artist("artist x").unwrap();
        let track = store
            .add_track("Song A", 200_000, &["Artist X"], Some("Album Y"))
            .unwrap();
        let again = store
            .add_track("Song A", 200_000, &["ARTIST X"], Some("album y"))
            .unwrap();

        assert_eq!(track, again);
        assert_eq!(store.artists_for_track(track).unwrap()[0].artist.id, artist);
        let counts = store.catalog_counts().unwrap();
        assert_eq!(
            counts,
            CatalogCounts {
                artists: 1,
                albums: 1,
                tracks: 1,
                plays: 0
            }
        );
    }

    #[test]
    fn test_add_track_rolls_back_when_album_step_fails() {
        let store = CatalogStore::open_in_memory().unwrap();
        let err = store
            .add_track("Song A", 200_000, &["Artist X"], Some("   "))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        for table in ["artist", "album", "track", "track_artist", "track_album"] {
            assert_eq!(count(&store, table), 0, "{table} should be empty");
        }
    }

    #[test]
    fn test_add_track_rolls_back_on_storage_failure() {
        let store = CatalogStore::open_in_memory().unwrap();
        store
            .database()
            .write(|tx| {
                tx.execute_batch(
                    "CREATE TRIGGER album_insert_fails BEFORE INSERT ON album
                     BEGIN SELECT RAISE(FAIL, 'disk full'); END;",
                )?;
                Ok(())
            })
            .unwrap();

        assert!(store
            .add_track("Song A", 200_000, &["Artist X"], Some("Album Y"))
            .is_err());
        for table in ["artist", "track", "track_artist", "track_album"] {
            assert_eq!(count(&store, table), 0, "{table} should be empty");
        }
    }

    #[test]
    fn test_remove_artist_keeps_track_and_album() {
        let store = CatalogStore::open_in_memory().unwrap();
        let track = store
            .add_track("Song A", 200_000, &["Artist X"], Some("Album Y"))
            .unwrap();
        let artist = store.find_artist_by_name("Artist X").unwrap().unwrap();
        store.record_play(track, None).unwrap();

        let report = store.remove_artist(artist.id).unwrap().unwrap();

        assert_eq!(report.track_artists, 1);
        assert_eq!(report.plays, 0);
        assert!(store.artists_for_track(track).unwrap().is_empty());
        assert!(store.get_track(track).unwrap().is_some());
        assert_eq!(store.albums_for_track(track).unwrap().len(), 1);
        assert_eq!(count(&store, "listening_history"), 1);
    }

    #[test]
    fn test_remove_track_cascades_only_its_rows() {
        let store = CatalogStore::open_in_memory().unwrap();
        let doomed = store
            .add_track("Song A", 200_000, &["Artist X"], Some("Album Y"))
            .unwrap();
        let kept = store
            .add_track("Song B", 210_000, &["Artist X"], Some("Album Y"))
            .unwrap();
        let t = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        store.record_play(doomed, Some(t)).unwrap();
        store.record_play(doomed, Some(t)).unwrap();
        store.record_play(kept, Some(t)).unwrap();

        let report = store.remove_track(doomed).unwrap().unwrap();

        assert_eq!(report.track_artists, 1);
        assert_eq!(report.track_albums, 1);
        assert_eq!(report.plays, 2);
        assert_eq!(count(&store, "track_artist"), 1);
        assert_eq!(count(&store, "track_album"), 1);
        assert_eq!(count(&store, "listening_history"), 1);
        assert_eq!(count(&store, "artist"), 1);
        assert_eq!(count(&store, "album"), 1);
        assert!(store.get_track(kept).unwrap().is_some());
    }

    #[test]
    fn test_remove_album_keeps_history() {
        let store = CatalogStore::open_in_memory().unwrap();
        let track = store
            .add_track("Song A", 200_000, &["Artist X"], Some("Album Y"))
            .unwrap();
        store.record_play(track, None).unwrap();
        let album = store.find_album_by_name("Album Y").unwrap().unwrap();

        let report = store.remove_album(album.id).unwrap().unwrap();

        assert_eq!(report.track_albums, 1);
        assert!(store.albums_for_track(track).unwrap().is_empty());
        assert_eq!(store.history_for_track(track, 10).unwrap().len(), 1);
        assert_eq!(store.artists_for_track(track).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_missing_is_none() {
        let store = CatalogStore::open_in_memory().unwrap();
        assert!(store.remove_track(TrackId::from_raw(1)).unwrap().is_none());
        assert!(store.remove_artist(ArtistId::from_raw(1)).unwrap().is_none());
        assert!(store.remove_album(AlbumId::from_raw(1)).unwrap().is_none());
    }
}
