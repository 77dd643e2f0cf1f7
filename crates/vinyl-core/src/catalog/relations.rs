//! Track credits and album membership.
//!
//! Join rows are created and removed only by linking and unlinking; they are
//! never edited in place. Deleting either endpoint removes them through
//! [`crate::schema::cascade`].

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::catalog::identity::{require_text, row_to_album, row_to_artist, row_to_track};
use crate::catalog::CatalogStore;
use crate::error::{Error, Result};
use crate::model::{Album, AlbumId, ArtistId, Credit, Track, TrackId, DEFAULT_ROLE};
use crate::schema::Endpoint;

/// What a link call did to the join table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkOutcome {
    /// A new join row was inserted.
    Created,
    /// The pair was already linked as requested.
    Unchanged,
    /// The pair was linked under another role; that row was replaced.
    RoleReplaced,
}

fn require_exists(conn: &Connection, endpoint: Endpoint, uid: i64) -> Result<()> {
    let exists: bool = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE uid = ?1)",
            endpoint.table()
        ),
        [uid],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(Error::dangling(endpoint.table(), uid))
    }
}

pub(crate) fn link_track_artist_in(
    conn: &Connection,
    track: TrackId,
    artist: ArtistId,
    role: &str,
) -> Result<LinkOutcome> {
    let role = require_text("credit role", role)?;
    require_exists(conn, Endpoint::Track, track.raw())?;
    require_exists(conn, Endpoint::Artist, artist.raw())?;

    let current: Option<String> = conn
        .query_row(
            "SELECT role FROM track_artist WHERE track_uid = ?1 AND artist_uid = ?2",
            rusqlite::params![track, artist],
            |row| row.get(0),
        )
        .optional()?;

    let outcome = match current {
        Some(existing) if existing == role => return Ok(LinkOutcome::Unchanged),
        Some(_) => {
            conn.execute(
                "DELETE FROM track_artist WHERE track_uid = ?1 AND artist_uid = ?2",
                rusqlite::params![track, artist],
            )?;
            LinkOutcome::RoleReplaced
        }
        None => LinkOutcome::Created,
    };

    conn.execute(
        "INSERT INTO track_artist (track_uid, artist_uid, role) VALUES (?1, ?2, ?3)",
        rusqlite::params![track, artist, role],
    )?;
    log::debug!(
        "Credit track {} -> artist {} as {:?}: {:?}",
        track,
        artist,
        role,
        outcome
    );
    Ok(outcome)
}

pub(crate) fn link_track_album_in(
    conn: &Connection,
    track: TrackId,
    album: AlbumId,
) -> Result<LinkOutcome> {
    require_exists(conn, Endpoint::Track, track.raw())?;
    require_exists(conn, Endpoint::Album, album.raw())?;

    let inserted = conn.execute(
        "INSERT INTO track_album (track_uid, album_uid) VALUES (?1, ?2)
         ON CONFLICT(track_uid, album_uid) DO NOTHING",
        rusqlite::params![track, album],
    )?;
    Ok(if inserted > 0 {
        LinkOutcome::Created
    } else {
        LinkOutcome::Unchanged
    })
}

// Linking
impl CatalogStore {
    /// Credit an artist on a track. `role` defaults to `"main"`.
    ///
    /// A pair holds at most one role: relinking with the same role is a
    /// no-op, with a different role it replaces the credit.
    pub fn link_track_artist(
        &self,
        track: TrackId,
        artist: ArtistId,
        role: Option<&str>,
    ) -> Result<LinkOutcome> {
        let role = role.unwrap_or(DEFAULT_ROLE);
        self.db
            .write(|tx| link_track_artist_in(tx, track, artist, role))
    }

    pub fn link_track_album(&self, track: TrackId, album: AlbumId) -> Result<LinkOutcome> {
        self.db.write(|tx| link_track_album_in(tx, track, album))
    }

    /// Remove one credit. Returns whether a row was removed.
    pub fn unlink_track_artist(&self, track: TrackId, artist: ArtistId) -> Result<bool> {
        self.db.write(|tx| {
            let removed = tx.execute(
                "DELETE FROM track_artist WHERE track_uid = ?1 AND artist_uid = ?2",
                rusqlite::params![track, artist],
            )?;
            Ok(removed > 0)
        })
    }

    /// Remove a track from an album. Returns whether a row was removed.
    pub fn unlink_track_album(&self, track: TrackId, album: AlbumId) -> Result<bool> {
        self.db.write(|tx| {
            let removed = tx.execute(
                "DELETE FROM track_album WHERE track_uid = ?1 AND album_uid = ?2",
                rusqlite::params![track, album],
            )?;
            Ok(removed > 0)
        })
    }
}

// Relationship queries
impl CatalogStore {
    pub fn artists_for_track(&self, track: TrackId) -> Result<Vec<Credit>> {
        self.db.read(|tx| {
            let mut stmt = tx.prepare(
                "SELECT a.uid, a.name, ta.role FROM artist a
                 INNER JOIN track_artist ta ON ta.artist_uid = a.uid
                 WHERE ta.track_uid = ?1
                 ORDER BY a.name",
            )?;
            let credits = stmt
                .query_map([track], |row| {
                    Ok(Credit {
                        artist: row_to_artist(row)?,
                        role: row.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(credits)
        })
    }

    pub fn albums_for_track(&self, track: TrackId) -> Result<Vec<Album>> {
        self.db.read(|tx| {
            let mut stmt = tx.prepare(
                "SELECT al.uid, al.name, al.cover IS NOT NULL FROM album al
                 INNER JOIN track_album ta ON ta.album_uid = al.uid
                 WHERE ta.track_uid = ?1
                 ORDER BY al.name",
            )?;
            let albums = stmt
                .query_map([track], row_to_album)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(albums)
        })
    }

    pub fn tracks_for_artist(&self, artist: ArtistId) -> Result<Vec<Track>> {
        self.db.read(|tx| {
            let mut stmt = tx.prepare(
                "SELECT t.uid, t.title, t.duration FROM track t
                 INNER JOIN track_artist ta ON ta.track_uid = t.uid
                 WHERE ta.artist_uid = ?1
                 ORDER BY t.title COLLATE NOCASE, t.uid",
            )?;
            let tracks = stmt
                .query_map([artist], row_to_track)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tracks)
        })
    }

    pub fn tracks_for_album(&self, album: AlbumId) -> Result<Vec<Track>> {
        self.db.read(|tx| {
            let mut stmt = tx.prepare(
                "SELECT t.uid, t.title, t.duration FROM track t
                 INNER JOIN track_album ta ON ta.track_uid = t.uid
                 WHERE ta.album_uid = ?1
                 ORDER BY t.title COLLATE NOCASE, t.uid",
            )?;
            let tracks = stmt
                .query_map([album], row_to_track)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tracks)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::FEATURED_ROLE;

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
    fn test_link_same_role_twice_is_idempotent() {
        let store = CatalogStore::open_in_memory().unwrap();
        let track = store.upsert_track("Around the World", 429_000, None).unwrap();
        let artist = store.upsert_artist("Daft Punk").unwrap();

        assert_eq!(
            store.link_track_artist(track, artist, None).unwrap(),
            LinkOutcome::Created
        );
        assert_eq!(
            store.link_track_artist(track, artist, Some("main")).unwrap(),
            LinkOutcome::Unchanged
        );
        assert_eq!(count(&store, "track_artist"), 1);
    }

    #[test]
    fn test_relink_with_new_role_replaces() {
        let store = CatalogStore::open_in_memory().unwrap();
        let track = store.upsert_track("Get Lucky", 369_000, None).unwrap();
        let artist = store.upsert_artist("Pharrell Williams").unwrap();

        store.link_track_artist(track, artist, None).unwrap();
        let outcome = store
            .link_track_artist(track, artist, Some(FEATURED_ROLE))
            .unwrap();

        assert_eq!(outcome, LinkOutcome::RoleReplaced);
        let credits = store.artists_for_track(track).unwrap();
        assert_eq!(credits.len(), 1);
        assert_eq!(credits[0].role, FEATURED_ROLE);
        assert!(!credits[0].is_main());
    }

    #[test]
    fn test_link_rejects_blank_role() {
        let store = CatalogStore::open_in_memory().unwrap();
        let track = store.upsert_track("Da Funk", 328_000, None).unwrap();
        let artist = store.upsert_artist("Daft Punk").unwrap();
        let err = store
            .link_track_artist(track, artist, Some(" "))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_link_missing_album_is_dangling_and_changes_nothing() {
        let store = CatalogStore::open_in_memory().unwrap();
        let track = store.upsert_track("Veridis Quo", 345_000, None).unwrap();

        let err = store
            .link_track_album(track, AlbumId::from_raw(77))
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "dangling reference: no album with uid 77"
        );
        assert_eq!(count(&store, "track_album"), 0);
        assert_eq!(count(&store, "album"), 0);
        assert_eq!(count(&store, "track"), 1);
    }

    #[test]
    fn test_link_missing_track_is_dangling() {
        let store = CatalogStore::open_in_memory().unwrap();
        let artist = store.upsert_artist("Justice").unwrap();
        let err = store
            .link_track_artist(TrackId::from_raw(5), artist, None)
            .unwrap_err();
        assert!(err.is_dangling());
    }

    #[test]
    fn test_link_track_album_is_idempotent() {
        let store = CatalogStore::open_in_memory().unwrap();
        let track = store.upsert_track("Digital Love", 301_000, None).unwrap();
        let album = store.upsert_album("Discovery", None).unwrap();

        assert_eq!(
            store.link_track_album(track, album).unwrap(),
            LinkOutcome::Created
        );
        assert_eq!(
            store.link_track_album(track, album).unwrap(),
            LinkOutcome::Unchanged
        );
        assert_eq!(count(&store, "track_album"), 1);
        assert_eq!(store.tracks_for_album(album).unwrap().len(), 1);
    }

    #[test]
    fn test_unlink() {
        let store = CatalogStore::open_in_memory().unwrap();
        let track = store.upsert_track("Aerodynamic", 207_000, None).unwrap();
        let artist = store.upsert_artist("Daft Punk").unwrap();
        let album = store.upsert_album("Discovery", None).unwrap();
        store.link_track_artist(track, artist, None).unwrap();
        store.link_track_album(track, album).unwrap();

        assert!(store.unlink_track_artist(track, artist).unwrap());
        assert!(!store.unlink_track_artist(track, artist).unwrap());
        assert!(store.unlink_track_album(track, album).unwrap());

        assert!(store.artists_for_track(track).unwrap().is_empty());
        assert!(store.albums_for_track(track).unwrap().is_empty());
        assert!(store.get_artist(artist).unwrap().is_some());
        assert!(store.get_album(album).unwrap().is_some());
    }

    #[test]
    fn test_tracks_for_artist() {
        let store = CatalogStore::open_in_memory().unwrap();
        let artist = store.upsert_artist("Air").unwrap();
        for (title, ms) in [("Sexy Boy", 298_000), ("All I Need", 268_000)] {
            let track = store.upsert_track(title, ms, None).unwrap();
            store.link_track_artist(track, artist, None).unwrap();
        }
        let titles: Vec<String> = store
            .tracks_for_artist(artist)
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["All I Need", "Sexy Boy"]);
    }
}
