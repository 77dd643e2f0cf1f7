//! Listening statistics over a time range.
//!
//! Ranges are half-open `[from, to)` in UTC. Calendar periods ("this week",
//! "today") are resolved in the caller's time zone first.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::history::sql_limit;
use crate::catalog::identity::{row_to_artist, row_to_track};
use crate::catalog::CatalogStore;
use crate::error::{Error, Result};
use crate::model::play::{from_epoch_ms, to_epoch_ms};
use crate::model::{Artist, Track};

/// Longest span [`CatalogStore::daily_totals`] accepts, about ten years.
pub const MAX_DAILY_SPAN: u32 = 3_660;

/// A calendar window relative to "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Today,
    /// Monday to Sunday.
    ThisWeek,
    ThisMonth,
    ThisYear,
    AllTime,
}

impl Period {
    /// UTC bounds of this period around `now`, in `now`'s time zone.
    pub fn bounds<Tz: TimeZone>(self, now: &DateTime<Tz>) -> (DateTime<Utc>, DateTime<Utc>) {
        let tz = now.timezone();
        let today = now.date_naive();
        let (first, next) = match self {
            Self::Today => (today, today.checked_add_days(Days::new(1))),
            Self::ThisWeek => {
                let monday = today
                    .checked_sub_days(Days::new(u64::from(today.weekday().num_days_from_monday())))
                    .unwrap_or(today);
                (monday, monday.checked_add_days(Days::new(7)))
            }
            Self::ThisMonth => {
                let first = today.with_day(1).unwrap_or(today);
                (first, first.checked_add_months(Months::new(1)))
            }
            Self::ThisYear => {
                let first = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                (first, first.checked_add_months(Months::new(12)))
            }
            Self::AllTime => return (DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC),
        };
        let end = next.map_or(DateTime::<Utc>::MAX_UTC, |day| start_of_day(&tz, day));
        (start_of_day(&tz, first), end)
    }
}

/// Local midnight of `day` in UTC. A midnight skipped by a DST change falls
/// back to UTC midnight.
fn start_of_day<Tz: TimeZone>(tz: &Tz, day: NaiveDate) -> DateTime<Utc> {
    let midnight = day.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .map_or_else(|| Utc.from_utc_datetime(&midnight), |local| local.with_timezone(&Utc))
}

/// An item with how often it was played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopItem<T> {
    pub item: T,
    pub plays: u64,
}

/// Aggregates for one time range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total_plays: u64,
    pub unique_tracks: u64,
    /// Distinct artists credited on played tracks.
    pub total_artists: u64,
    /// Sum of track durations over all plays.
    pub total_play_time_ms: i64,
    pub top_tracks: Vec<TopItem<Track>>,
    /// An artist scores one play for every play of a track crediting them.
    pub top_artists: Vec<TopItem<Artist>>,
}

/// Plays on one local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStat {
    pub date: NaiveDate,
    pub play_count: u64,
    pub total_play_time_ms: i64,
}

impl CatalogStore {
    /// Aggregate plays in `[from, to)`, keeping the `top_n` most played
    /// tracks and artists. Computed from a single snapshot.
    pub fn period_stats(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        top_n: usize,
    ) -> Result<PeriodStats> {
        let (from_ms, to_ms) = (to_epoch_ms(from), to_epoch_ms(to));
        self.db.read(|tx| {
            let (total_plays, unique_tracks, total_play_time_ms) = tx.query_row(
                "SELECT COUNT(*), COUNT(DISTINCT h.track_uid), COALESCE(SUM(t.duration), 0)
                 FROM listening_history h
                 INNER JOIN track t ON t.uid = h.track_uid
                 WHERE h.listened_at >= ?1 AND h.listened_at < ?2",
                [from_ms, to_ms],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

            let total_artists = tx.query_row(
                "SELECT COUNT(DISTINCT ta.artist_uid)
                 FROM listening_history h
                 INNER JOIN track_artist ta ON ta.track_uid = h.track_uid
                 WHERE h.listened_at >= ?1 AND h.listened_at < ?2",
                [from_ms, to_ms],
                |row| row.get(0),
            )?;

            let mut stmt = tx.prepare(
                "SELECT t.uid, t.title, t.duration, COUNT(*) AS plays
                 FROM listening_history h
                 INNER JOIN track t ON t.uid = h.track_uid
                 WHERE h.listened_at >= ?1 AND h.listened_at < ?2
                 GROUP BY t.uid
                 ORDER BY plays DESC, t.uid ASC
                 LIMIT ?3",
            )?;
            let top_tracks = stmt
                .query_map(
                    [from_ms, to_ms, sql_limit(top_n)],
                    |row| {
                        Ok(TopItem {
                            item: row_to_track(row)?,
                            plays: row.get(3)?,
                        })
                    },
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut stmt = tx.prepare(
                "SELECT a.uid, a.name, COUNT(*) AS plays
                 FROM listening_history h
                 INNER JOIN track_artist ta ON ta.track_uid = h.track_uid
                 INNER JOIN artist a ON a.uid = ta.artist_uid
                 WHERE h.listened_at >= ?1 AND h.listened_at < ?2
                 GROUP BY a.uid
                 ORDER BY plays DESC, a.uid ASC
                 LIMIT ?3",
            )?;
            let top_artists = stmt
                .query_map(
                    [from_ms, to_ms, sql_limit(top_n)],
                    |row| {
                        Ok(TopItem {
                            item: row_to_artist(row)?,
                            plays: row.get(2)?,
                        })
                    },
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(PeriodStats {
                from,
                to,
                total_plays,
                unique_tracks,
                total_artists,
                total_play_time_ms,
                top_tracks,
                top_artists,
            })
        })
    }

    /// [`CatalogStore::period_stats`] for a calendar period around `now`.
    pub fn stats_for<Tz: TimeZone>(
        &self,
        period: Period,
        now: &DateTime<Tz>,
        top_n: usize,
    ) -> Result<PeriodStats> {
        let (from, to) = period.bounds(now);
        self.period_stats(from, to, top_n)
    }

    /// Per-day totals for `days` consecutive local days starting at
    /// `first_day`, in time zone `tz`. Days without plays are included.
    /// At most [`MAX_DAILY_SPAN`] days.
    pub fn daily_totals<Tz: TimeZone>(
        &self,
        first_day: NaiveDate,
        days: u32,
        tz: &Tz,
    ) -> Result<Vec<DailyStat>> {
        if days > MAX_DAILY_SPAN {
            return Err(Error::invalid(format!(
                "daily totals span at most {MAX_DAILY_SPAN} days, got {days}"
            )));
        }
        let from = start_of_day(tz, first_day);
        let to = first_day
            .checked_add_days(Days::new(u64::from(days)))
            .map_or(DateTime::<Utc>::MAX_UTC, |day| start_of_day(tz, day));

        let mut buckets: BTreeMap<NaiveDate, DailyStat> = first_day
            .iter_days()
            .take(days as usize)
            .map(|date| {
                (
                    date,
                    DailyStat {
                        date,
                        play_count: 0,
                        total_play_time_ms: 0,
                    },
                )
            })
            .collect();

        let plays: Vec<(i64, i64)> = self.db.read(|tx| {
            let mut stmt = tx.prepare(
                "SELECT h.listened_at, t.duration
                 FROM listening_history h
                 INNER JOIN track t ON t.uid = h.track_uid
                 WHERE h.listened_at >= ?1 AND h.listened_at < ?2",
            )?;
            let rows = stmt
                .query_map(
                    rusqlite::params![to_epoch_ms(from), to_epoch_ms(to)],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        for (listened_ms, duration_ms) in plays {
            let date = from_epoch_ms(listened_ms).with_timezone(tz).date_naive();
            if let Some(bucket) = buckets.get_mut(&date) {
                bucket.play_count += 1;
                bucket.total_play_time_ms += duration_ms;
            }
        }

        Ok(buckets.into_values().collect())
    }
}
