//! Cascading deletes as an explicit reference graph.
//!
//! Every row that references an artist, album, or track is listed here as an
//! edge from the referenced table. Deleting an endpoint removes its dependents
//! first and then the endpoint, all on the caller's transaction. The schema
//! also declares `ON DELETE CASCADE`, but nothing here relies on it.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A table whose `column` holds the uid of a referenced endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependent {
    pub table: &'static str,
    pub column: &'static str,
}

const TRACK_DEPENDENTS: &[Dependent] = &[
    Dependent {
        table: "track_artist",
        column: "track_uid",
    },
    Dependent {
        table: "track_album",
        column: "track_uid",
    },
    Dependent {
        table: "listening_history",
        column: "track_uid",
    },
];

const ARTIST_DEPENDENTS: &[Dependent] = &[Dependent {
    table: "track_artist",
    column: "artist_uid",
}];

const ALBUM_DEPENDENTS: &[Dependent] = &[Dependent {
    table: "track_album",
    column: "album_uid",
}];

/// A table whose rows can be deleted by collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Artist,
    Album,
    Track,
}

impl Endpoint {
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Album => "album",
            Self::Track => "track",
        }
    }

    #[must_use]
    pub const fn dependents(self) -> &'static [Dependent] {
        match self {
            Self::Artist => ARTIST_DEPENDENTS,
            Self::Album => ALBUM_DEPENDENTS,
            Self::Track => TRACK_DEPENDENTS,
        }
    }
}

/// Rows removed by one cascading delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeReport {
    pub endpoint: Endpoint,
    pub uid: i64,
    pub track_artists: usize,
    pub track_albums: usize,
    pub plays: usize,
}

impl CascadeReport {
    const fn new(endpoint: Endpoint, uid: i64) -> Self {
        Self {
            endpoint,
            uid,
            track_artists: 0,
            track_albums: 0,
            plays: 0,
        }
    }

    fn record(&mut self, table: &str, removed: usize) {
        match table {
            "track_artist" => self.track_artists += removed,
            "track_album" => self.track_albums += removed,
            "listening_history" => self.plays += removed,
            _ => {}
        }
    }

    /// Dependent rows removed along with the endpoint.
    #[must_use]
    pub const fn dependents_removed(&self) -> usize {
        self.track_artists + self.track_albums + self.plays
    }
}

/// Delete `uid` from the endpoint's table together with every row that
/// references it. Returns `None` if the endpoint does not exist.
pub(crate) fn delete_cascading(
    conn: &Connection,
    endpoint: Endpoint,
    uid: i64,
) -> Result<Option<CascadeReport>> {
    let exists: bool = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE uid = ?1)",
            endpoint.table()
        ),
        [uid],
        |row| row.get(0),
    )?;
    if !exists {
        return Ok(None);
    }

    let mut report = CascadeReport::new(endpoint, uid);
    for dependent in endpoint.dependents() {
        let removed = conn.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1",
                dependent.table, dependent.column
            ),
            [uid],
        )?;
        report.record(dependent.table, removed);
    }
    conn.execute(
        &format!("DELETE FROM {} WHERE uid = ?1", endpoint.table()),
        [uid],
    )?;

    log::info!(
        "Deleted {} {} and {} dependent rows",
        endpoint.table(),
        uid,
        report.dependents_removed()
    );
    Ok(Some(report))
}
