/// A schema migration.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATION_001: &str = r#"
-- Artists; names compare case-insensitively
CREATE TABLE IF NOT EXISTS artist (
    uid INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL COLLATE NOCASE UNIQUE
);

-- Albums; the cover is optional and always paired with its MIME type
CREATE TABLE IF NOT EXISTS album (
    uid INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL COLLATE NOCASE UNIQUE,
    cover BLOB,
    cover_mime TEXT,
    CHECK ((cover IS NULL) = (cover_mime IS NULL))
);

-- Tracks; title alone is not unique, (title, duration) is
CREATE TABLE IF NOT EXISTS track (
    uid INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    duration INTEGER NOT NULL CHECK (duration >= 0)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_track_title_duration ON track(title, duration);

-- Track credits (many-to-many), one role per pair
CREATE TABLE IF NOT EXISTS track_artist (
    track_uid INTEGER NOT NULL REFERENCES track(uid) ON DELETE CASCADE,
    artist_uid INTEGER NOT NULL REFERENCES artist(uid) ON DELETE CASCADE,
    role TEXT NOT NULL DEFAULT 'main',
    PRIMARY KEY (track_uid, artist_uid)
);

CREATE INDEX IF NOT EXISTS idx_track_artist_artist_uid ON track_artist(artist_uid);

-- Album membership (many-to-many)
CREATE TABLE IF NOT EXISTS track_album (
    track_uid INTEGER NOT NULL REFERENCES track(uid) ON DELETE CASCADE,
    album_uid INTEGER NOT NULL REFERENCES album(uid) ON DELETE CASCADE,
    PRIMARY KEY (track_uid, album_uid)
);

CREATE INDEX IF NOT EXISTS idx_track_album_album_uid ON track_album(album_uid);

-- Listening history (append-only), listened_at in epoch milliseconds
CREATE TABLE IF NOT EXISTS listening_history (
    uid INTEGER PRIMARY KEY AUTOINCREMENT,
    track_uid INTEGER NOT NULL REFERENCES track(uid) ON DELETE CASCADE,
    listened_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_listening_history_track_uid ON listening_history(track_uid);
CREATE INDEX IF NOT EXISTS idx_listening_history_listened_at ON listening_history(listened_at);

CREATE TRIGGER IF NOT EXISTS listening_history_no_update
BEFORE UPDATE ON listening_history
BEGIN
    SELECT RAISE(ABORT, 'listening history is append-only');
END;
"#;

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: MIGRATION_001,
}];
