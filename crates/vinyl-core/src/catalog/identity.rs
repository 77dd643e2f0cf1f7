//! Artists, albums and tracks: natural-key deduplication and lookups.
//!
//! Upserts never read-then-insert. They insert with `ON CONFLICT DO NOTHING`
//! and then resolve the surviving row by its natural key, so the unique
//! index decides which writer wins.

use rusqlite::{Connection, OptionalExtension, Row};

use crate::catalog::relations::link_track_album_in;
use crate::catalog::CatalogStore;
use crate::error::{Error, Result};
use crate::model::{Album, AlbumId, Artist, ArtistId, Cover, Track, TrackId};

/// Trimmed, non-blank text or `InvalidArgument`.
pub(crate) fn require_text<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid(format!("{field} must not be blank")));
    }
    Ok(trimmed)
}

pub(crate) fn upsert_artist_in(conn: &Connection, name: &str) -> Result<ArtistId> {
    let name = require_text("artist name", name)?;
    let inserted = conn.execute(
        "INSERT INTO artist (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        [name],
    )?;
    let id = conn.query_row("SELECT uid FROM artist WHERE name = ?1", [name], |row| {
        row.get(0)
    })?;
    log::debug!(
        "Artist {:?} -> {} ({})",
        name,
        id,
        if inserted > 0 { "created" } else { "existing" }
    );
    Ok(id)
}

pub(crate) fn upsert_album_in(
    conn: &Connection,
    name: &str,
    cover: Option<&Cover>,
) -> Result<AlbumId> {
    let name = require_text("album name", name)?;
    conn.execute(
        "INSERT INTO album (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        [name],
    )?;
    let id: AlbumId =
        conn.query_row("SELECT uid FROM album WHERE name = ?1", [name], |row| {
            row.get(0)
        })?;
    if let Some(cover) = cover {
        store_cover_in(conn, id, Some(cover))?;
    }
    log::debug!("Album {:?} -> {}", name, id);
    Ok(id)
}

pub(crate) fn upsert_track_in(
    conn: &Connection,
    title: &str,
    duration_ms: i64,
    album_name: Option<&str>,
) -> Result<TrackId> {
    let title = require_text("track title", title)?;
    if duration_ms < 0 {
        return Err(Error::invalid(format!(
            "track duration must not be negative, got {duration_ms}"
        )));
    }

    conn.execute(
        "INSERT INTO track (title, duration) VALUES (?1, ?2)
         ON CONFLICT(title, duration) DO NOTHING",
        rusqlite::params![title, duration_ms],
    )?;
    let id = conn.query_row(
        "SELECT uid FROM track WHERE title = ?1 AND duration = ?2",
        rusqlite::params![title, duration_ms],
        |row| row.get(0),
    )?;

    if let Some(album_name) = album_name {
        let album = upsert_album_in(conn, album_name, None)?;
        link_track_album_in(conn, id, album)?;
    }
    log::debug!("Track {:?} ({} ms) -> {}", title, duration_ms, id);
    Ok(id)
}

fn store_cover_in(conn: &Connection, album: AlbumId, cover: Option<&Cover>) -> Result<()> {
    let updated = conn.execute(
        "UPDATE album SET cover = ?2, cover_mime = ?3 WHERE uid = ?1",
        rusqlite::params![
            album,
            cover.map(Cover::data),
            cover.map(Cover::mime_type)
        ],
    )?;
    if updated == 0 {
        return Err(Error::dangling("album", album.raw()));
    }
    Ok(())
}

pub(crate) fn row_to_artist(row: &Row<'_>) -> rusqlite::Result<Artist> {
    Ok(Artist {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

/// Expects `uid, name, cover IS NOT NULL`.
pub(crate) fn row_to_album(row: &Row<'_>) -> rusqlite::Result<Album> {
    Ok(Album {
        id: row.get(0)?,
        name: row.get(1)?,
        has_cover: row.get(2)?,
    })
}

pub(crate) fn row_to_track(row: &Row<'_>) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        title: row.get(1)?,
        duration_ms: row.get(2)?,
    })
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// Upserts
impl CatalogStore {
    /// Resolve an artist by case-insensitive name, creating it if needed.
    pub fn upsert_artist(&self, name: &str) -> Result<ArtistId> {
        self.db.write(|tx| upsert_artist_in(tx, name))
    }

    /// Resolve an album by case-insensitive name, creating it if needed.
    ///
    /// A given cover is attached to the album whether it was created or
    /// already existed.
    pub fn upsert_album(&self, name: &str, cover: Option<&Cover>) -> Result<AlbumId> {
        self.db.write(|tx| upsert_album_in(tx, name, cover))
    }

    /// Resolve a track by exact title and duration, creating it if needed,
    /// and optionally file it under an album (created on demand).
    pub fn upsert_track(
        &self,
        title: &str,
        duration_ms: i64,
        album_name: Option<&str>,
    ) -> Result<TrackId> {
        self.db
            .write(|tx| upsert_track_in(tx, title, duration_ms, album_name))
    }

    /// Attach, replace, or (with `None`) remove an album's cover.
    pub fn set_album_cover(&self, album: AlbumId, cover: Option<&Cover>) -> Result<()> {
        self.db.write(|tx| store_cover_in(tx, album, cover))
    }

    /// Validate raw bytes against this store's size limit.
    pub fn cover_from_bytes(&self, data: Vec<u8>) -> Result<Cover> {
        Cover::from_bytes(data, self.max_cover_bytes)
    }
}

// Lookups
impl CatalogStore {
    pub fn get_artist(&self, id: ArtistId) -> Result<Option<Artist>> {
        self.db.read(|tx| {
            Ok(tx
                .query_row(
                    "SELECT uid, name FROM artist WHERE uid = ?1",
                    [id],
                    row_to_artist,
                )
                .optional()?)
        })
    }

    pub fn get_album(&self, id: AlbumId) -> Result<Option<Album>> {
        self.db.read(|tx| {
            Ok(tx
                .query_row(
                    "SELECT uid, name, cover IS NOT NULL FROM album WHERE uid = ?1",
                    [id],
                    row_to_album,
                )
                .optional()?)
        })
    }

    pub fn get_track(&self, id: TrackId) -> Result<Option<Track>> {
        self.db.read(|tx| {
            Ok(tx
                .query_row(
                    "SELECT uid, title, duration FROM track WHERE uid = ?1",
                    [id],
                    row_to_track,
                )
                .optional()?)
        })
    }

    pub fn find_artist_by_name(&self, name: &str) -> Result<Option<Artist>> {
        self.db.read(|tx| {
            Ok(tx
                .query_row(
                    "SELECT uid, name FROM artist WHERE name = ?1",
                    [name.trim()],
                    row_to_artist,
                )
                .optional()?)
        })
    }

    pub fn find_album_by_name(&self, name: &str) -> Result<Option<Album>> {
        self.db.read(|tx| {
            Ok(tx
                .query_row(
                    "SELECT uid, name, cover IS NOT NULL FROM album WHERE name = ?1",
                    [name.trim()],
                    row_to_album,
                )
                .optional()?)
        })
    }

    /// The album's cover, loaded on demand.
    pub fn album_cover(&self, id: AlbumId) -> Result<Option<Cover>> {
        self.db.read(|tx| {
            let stored: Option<(Option<String>, Option<Vec<u8>>)> = tx
                .query_row(
                    "SELECT cover_mime, cover FROM album WHERE uid = ?1",
                    [id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            Ok(match stored {
                Some((Some(mime), Some(data))) => Some(Cover::from_stored(mime, data)),
                _ => None,
            })
        })
    }

    pub fn list_artists(&self) -> Result<Vec<Artist>> {
        self.db.read(|tx| {
            let mut stmt = tx.prepare("SELECT uid, name FROM artist ORDER BY name, uid")?;
            let artists = stmt
                .query_map([], row_to_artist)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(artists)
        })
    }

    pub fn list_albums(&self) -> Result<Vec<Album>> {
        self.db.read(|tx| {
            let mut stmt = tx.prepare(
                "SELECT uid, name, cover IS NOT NULL FROM album ORDER BY name, uid",
            )?;
            let albums = stmt
                .query_map([], row_to_album)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(albums)
        })
    }

    pub fn list_tracks(&self) -> Result<Vec<Track>> {
        self.db.read(|tx| {
            let mut stmt = tx.prepare(
                "SELECT uid, title, duration FROM track ORDER BY title COLLATE NOCASE, uid",
            )?;
            let tracks = stmt
                .query_map([], row_to_track)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tracks)
        })
    }

    /// Tracks whose title contains `query`, ignoring ASCII case.
    pub fn search_tracks(&self, query: &str) -> Result<Vec<Track>> {
        let pattern = like_pattern(query.trim());
        self.db.read(|tx| {
            let mut stmt = tx.prepare(
                "SELECT uid, title, duration FROM track
                 WHERE title LIKE ?1 ESCAPE '\\'
                 ORDER BY title COLLATE NOCASE, uid",
            )?;
            let tracks = stmt
                .query_map([pattern.as_str()], row_to_track)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tracks)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::album::tests::{jpeg_bytes, png_bytes};

    fn store() -> CatalogStore {
        CatalogStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_upsert_artist_is_case_insensitive() {
        let store = store();
        let ids: Vec<ArtistId> = ["Daft Punk", "daft punk", "DAFT PUNK", "  Daft Punk "]
            .iter()
            .map(|name| store.upsert_artist(name).unwrap())
            .collect();

        assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
        let artists = store.list_artists().unwrap();
        assert_eq!(artists.len(), 1);
        assert_eq!(artists[0].name, "Daft Punk");
    }

    #[test]
    fn test_upsert_artist_rejects_blank() {
        let store = store();
        let err = store.upsert_artist("   ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(store.list_artists().unwrap().is_empty());
    }

    #[test]
    fn test_upsert_album_dedups_and_attaches_cover_later() {
        let store = store();
        let first = store.upsert_album("Discovery", None).unwrap();
        assert!(!store.get_album(first).unwrap().unwrap().has_cover);

        let cover = store.cover_from_bytes(png_bytes()).unwrap();
        let second = store.upsert_album("DISCOVERY", Some(&cover)).unwrap();
        assert_eq!(first, second);

        let album = store.get_album(first).unwrap().unwrap();
        assert!(album.has_cover);
        assert_eq!(store.album_cover(first).unwrap(), Some(cover));
        assert_eq!(store.list_albums().unwrap().len(), 1);
    }

    #[test]
    fn test_set_album_cover_replace_and_clear() {
        let store = store();
        let album = store.upsert_album("Homework", None).unwrap();

        let png = store.cover_from_bytes(png_bytes()).unwrap();
        store.set_album_cover(album, Some(&png)).unwrap();
        let jpeg = store.cover_from_bytes(jpeg_bytes()).unwrap();
        store.set_album_cover(album, Some(&jpeg)).unwrap();
        assert_eq!(
            store.album_cover(album).unwrap().unwrap().mime_type(),
            "image/jpeg"
        );

        store.set_album_cover(album, None).unwrap();
        assert!(store.album_cover(album).unwrap().is_none());
        assert!(!store.get_album(album).unwrap().unwrap().has_cover);
    }

    #[test]
    fn test_set_cover_on_missing_album_is_dangling() {
        let store = store();
        let cover = store.cover_from_bytes(png_bytes()).unwrap();
        let err = store
            .set_album_cover(AlbumId::from_raw(404), Some(&cover))
            .unwrap_err();
        assert!(err.is_dangling());
    }

    #[test]
    fn test_upsert_track_resolves_title_and_duration() {
        let store = store();
        let a = store.upsert_track("Intro", 60_000, None).unwrap();
        let b = store.upsert_track("Intro", 60_000, None).unwrap();
        let c = store.upsert_track("Intro", 95_000, None).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(store.list_tracks().unwrap().len(), 2);
    }

    #[test]
    fn test_upsert_track_validates_input() {
        let store = store();
        assert_eq!(
            store.upsert_track("", 1_000, None).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            store.upsert_track("Song", -1, None).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert!(store.list_tracks().unwrap().is_empty());
    }

    #[test]
    fn test_upsert_track_with_album_links_it() {
        let store = store();
        let track = store
            .upsert_track("One More Time", 320_000, Some("Discovery"))
            .unwrap();
        let albums = store.albums_for_track(track).unwrap();
        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].name, "Discovery");
    }

    #[test]
    fn test_lookups_by_name() {
        let store = store();
        let artist = store.upsert_artist("Portishead").unwrap();
        let album = store.upsert_album("Dummy", None).unwrap();

        assert_eq!(
            store.find_artist_by_name("PORTISHEAD").unwrap().map(|a| a.id),
            Some(artist)
        );
        assert_eq!(
            store.find_album_by_name("dummy").unwrap().map(|a| a.id),
            Some(album)
        );
        assert!(store.find_artist_by_name("Massive Attack").unwrap().is_none());
        assert!(store.get_track(TrackId::from_raw(1)).unwrap().is_none());
    }

    #[test]
    fn test_list_artists_orders_without_case() {
        let store = store();
        for name in ["beck", "Air", "Cake"] {
            store.upsert_artist(name).unwrap();
        }
        let names: Vec<String> = store
            .list_artists()
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Air", "beck", "Cake"]);
    }

    #[test]
    fn test_search_tracks_escapes_wildcards() {
        let store = store();
        store.upsert_track("100% Pure Love", 200_000, None).unwrap();
        store.upsert_track("100 Years", 180_000, None).unwrap();
        store.upsert_track("pure shores", 270_000, None).unwrap();

        let percent: Vec<String> = store
            .search_tracks("100%")
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(percent, vec!["100% Pure Love"]);

        assert_eq!(store.search_tracks("PURE").unwrap().len(), 2);
    }

    #[test]
    fn test_like_pattern() {
        assert_eq!(like_pattern("a_b%c\\"), "%a\\_b\\%c\\\\%");
    }
}
