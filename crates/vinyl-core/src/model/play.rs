use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{PlayId, TrackId};

/// One playback event from the listening history.
///
/// Plays are never modified once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Play {
    pub id: PlayId,
    pub track_id: TrackId,
    pub listened_at: DateTime<Utc>,
}

/// Number of recorded plays for one track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayCount {
    pub track_id: TrackId,
    pub plays: u64,
}

/// Timestamps are persisted as epoch milliseconds.
pub(crate) fn to_epoch_ms(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Out-of-range values clamp to the epoch rather than failing a read.
pub(crate) fn from_epoch_ms(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}
