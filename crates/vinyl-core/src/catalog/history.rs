//! Listening history: an append-only log of plays.
//!
//! Ties on `listened_at` are broken by play uid, i.e. insertion order.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};

use crate::catalog::CatalogStore;
use crate::error::{Error, Result};
use crate::model::play::{from_epoch_ms, to_epoch_ms};
use crate::model::{Play, PlayCount, PlayId, TrackId};

/// Clamp a caller-facing limit to what SQLite accepts.
pub(crate) fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

pub(crate) fn record_play_in(
    conn: &Connection,
    track: TrackId,
    listened_at: DateTime<Utc>,
) -> Result<Play> {
    let listened_ms = to_epoch_ms(listened_at);
    let inserted = conn.execute(
        "INSERT INTO listening_history (track_uid, listened_at)
         SELECT uid, ?2 FROM track WHERE uid = ?1",
        rusqlite::params![track, listened_ms],
    )?;
    if inserted == 0 {
        return Err(Error::dangling("track", track.raw()));
    }

    let play = Play {
        id: PlayId::from_raw(conn.last_insert_rowid()),
        track_id: track,
        listened_at: from_epoch_ms(listened_ms),
    };
    log::debug!("Recorded play {} of track {}", play.id, track);
    Ok(play)
}

fn row_to_play(row: &Row<'_>) -> rusqlite::Result<Play> {
    Ok(Play {
        id: row.get(0)?,
        track_id: row.get(1)?,
        listened_at: from_epoch_ms(row.get(2)?),
    })
}

impl CatalogStore {
    /// Append one play. `listened_at` defaults to now.
    pub fn record_play(
        &self,
        track: TrackId,
        listened_at: Option<DateTime<Utc>>,
    ) -> Result<Play> {
        // Stamped under the writer lock so uid order follows time order.
        self.db.write(|tx| {
            let at = listened_at.unwrap_or_else(Utc::now);
            record_play_in(tx, track, at)
        })
    }

    /// Most recent plays first, at most `limit`, strictly before `before`.
    /// Without `before`, plays up to and including now; future-stamped plays
    /// are never "recent".
    pub fn recent_plays(
        &self,
        limit: usize,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<Play>> {
        let before_ms = before.map_or_else(
            || to_epoch_ms(Utc::now()).saturating_add(1),
            to_epoch_ms,
        );
        self.db.read(|tx| {
            let mut stmt = tx.prepare(
                "SELECT uid, track_uid, listened_at FROM listening_history
                 WHERE listened_at < ?1
                 ORDER BY listened_at DESC, uid DESC
                 LIMIT ?2",
            )?;
            let plays = stmt
                .query_map(rusqlite::params![before_ms, sql_limit(limit)], row_to_play)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(plays)
        })
    }

    /// Plays per track, optionally only those at or after `since`. Most
    /// played first; ties by track uid.
    pub fn play_counts(&self, since: Option<DateTime<Utc>>) -> Result<Vec<PlayCount>> {
        let since_ms = since.map_or(i64::MIN, to_epoch_ms);
        self.db.read(|tx| {
            let mut stmt = tx.prepare(
                "SELECT track_uid, COUNT(*) AS plays FROM listening_history
                 WHERE listened_at >= ?1
                 GROUP BY track_uid
                 ORDER BY plays DESC, track_uid ASC",
            )?;
            let counts = stmt
                .query_map([since_ms], |row| {
                    Ok(PlayCount {
                        track_id: row.get(0)?,
                        plays: row.get(1)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(counts)
        })
    }

    /// Plays of one track, most recent first.
    pub fn history_for_track(&self, track: TrackId, limit: usize) -> Result<Vec<Play>> {
        self.db.read(|tx| {
            let mut stmt = tx.prepare(
                "SELECT uid, track_uid, listened_at FROM listening_history
                 WHERE track_uid = ?1
                 ORDER BY listened_at DESC, uid DESC
                 LIMIT ?2",
            )?;
            let plays = stmt
                .query_map(rusqlite::params![track, sql_limit(limit)], row_to_play)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(plays)
        })
    }

    /// Plays in the half-open range `[from, to)`, most recent first.
    pub fn plays_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Play>> {
        self.db.read(|tx| {
            let mut stmt = tx.prepare(
                "SELECT uid, track_uid, listened_at FROM listening_history
                 WHERE listened_at >= ?1 AND listened_at < ?2
                 ORDER BY listened_at DESC, uid DESC",
            )?;
            let plays = stmt
                .query_map(
                    rusqlite::params![to_epoch_ms(from), to_epoch_ms(to)],
                    row_to_play,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(plays)
        })
    }

    pub fn count_plays_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<u64> {
        self.db.read(|tx| {
            Ok(tx.query_row(
                "SELECT COUNT(*) FROM listening_history
                 WHERE listened_at >= ?1 AND listened_at < ?2",
                rusqlite::params![to_epoch_ms(from), to_epoch_ms(to)],
                |row| row.get(0),
            )?)
        })
    }
}
