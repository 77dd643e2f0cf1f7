use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use vinyl_core::Period;

#[derive(Debug, Parser)]
#[command(name = "vinyl", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the catalog (default: ~/.local/share/vinyl/vinyl.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Add a track with its artists and album in one step
    ///
    /// Artists and the album are matched by name, ignoring case, and created
    /// when missing. Adding the same title and duration again returns the
    /// existing track and only adds missing links.
    Add {
        title: String,

        /// Duration as m:ss, h:mm:ss or plain milliseconds
        #[arg(short, long, value_parser = parse_duration)]
        duration: i64,

        /// Main artist (repeatable)
        #[arg(short, long = "artist")]
        artists: Vec<String>,

        #[arg(long)]
        album: Option<String>,
    },
    /// Credit an artist on a track or put a track on an album
    #[command(subcommand)]
    Link(LinkCommand),
    /// Remove a credit or an album membership
    #[command(subcommand)]
    Unlink(UnlinkCommand),
    /// Delete a track, artist or album with everything that references it
    #[command(subcommand)]
    Remove(RemoveCommand),
    /// Attach, export or clear album cover art
    #[command(subcommand)]
    Cover(CoverCommand),
    /// Record a play of a track
    Play {
        track: i64,

        /// When it was played (RFC 3339); defaults to now
        #[arg(long, value_parser = parse_timestamp)]
        at: Option<DateTime<Utc>>,
    },
    /// Show recently played tracks
    Recent {
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,

        /// Only plays strictly before this time (RFC 3339)
        #[arg(long, value_parser = parse_timestamp)]
        before: Option<DateTime<Utc>>,
    },
    /// Show play counts per track
    Counts {
        /// Only plays at or after this time (RFC 3339)
        #[arg(long, value_parser = parse_timestamp)]
        since: Option<DateTime<Utc>>,
    },
    /// Summarize listening over a calendar period
    Stats {
        #[arg(short, long, value_enum, default_value_t = PeriodArg::Week)]
        period: PeriodArg,

        /// How many top tracks and artists to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Per-day play totals in local time
    Daily {
        /// First day (YYYY-MM-DD); defaults to this week's Monday
        #[arg(long)]
        from: Option<NaiveDate>,

        #[arg(long, default_value_t = 7,
              value_parser = clap::value_parser!(u32).range(1..=i64::from(vinyl_core::MAX_DAILY_SPAN)))]
        days: u32,
    },
    /// Show one track with its credits, albums and recent plays
    Show { track: i64 },
    /// List tracks, optionally filtered
    Tracks {
        /// Title substring to search for
        query: Option<String>,

        #[arg(long, conflicts_with_all = ["album", "query"])]
        artist: Option<i64>,

        #[arg(long, conflicts_with = "query")]
        album: Option<i64>,
    },
    /// List artists
    Artists,
    /// List albums
    Albums,
    /// Show catalog totals
    Status,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum LinkCommand {
    Artist {
        track: i64,
        artist: i64,

        /// Credit role, e.g. "featured" (default: main)
        #[arg(long)]
        role: Option<String>,
    },
    Album { track: i64, album: i64 },
}

#[derive(Debug, Subcommand)]
pub enum UnlinkCommand {
    Artist { track: i64, artist: i64 },
    Album { track: i64, album: i64 },
}

#[derive(Debug, Subcommand)]
pub enum RemoveCommand {
    /// Also deletes the track's credits, album links and plays
    Track { id: i64 },
    /// Also deletes the artist's credits; tracks stay
    Artist { id: i64 },
    /// Also deletes the album's track links; tracks stay
    Album { id: i64 },
}

#[derive(Debug, Subcommand)]
pub enum CoverCommand {
    /// Attach an image file (JPEG, PNG, WebP or GIF)
    Set { album: i64, file: PathBuf },
    /// Write the cover to a file
    Export { album: i64, out: PathBuf },
    Clear { album: i64 },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file if missing
    Init,
    /// Set a value in the config file
    Set { key: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PeriodArg {
    Today,
    Week,
    Month,
    Year,
    All,
}

impl From<PeriodArg> for Period {
    fn from(arg: PeriodArg) -> Self {
        match arg {
            PeriodArg::Today => Self::Today,
            PeriodArg::Week => Self::ThisWeek,
            PeriodArg::Month => Self::ThisMonth,
            PeriodArg::Year => Self::ThisYear,
            PeriodArg::All => Self::AllTime,
        }
    }
}

/// Parse "m:ss", "h:mm:ss" or a plain millisecond count.
pub fn parse_duration(s: &str) -> Result<i64, String> {
    let s = s.trim();
    if !s.contains(':') {
        return s
            .parse::<i64>()
            .ok()
            .filter(|ms| *ms >= 0)
            .ok_or_else(|| format!("invalid duration {s:?}"));
    }

    let mut seconds: i64 = 0;
    for (i, part) in s.split(':').enumerate() {
        let value: i64 = part
            .parse()
            .ok()
            .filter(|v| *v >= 0 && (i == 0 || *v < 60))
            .ok_or_else(|| format!("invalid duration {s:?}"))?;
        seconds = seconds
            .checked_mul(60)
            .and_then(|acc| acc.checked_add(value))
            .ok_or_else(|| format!("duration {s:?} is too long"))?;
    }
    if s.split(':').count() > 3 {
        return Err(format!("invalid duration {s:?}"));
    }
    seconds
        .checked_mul(1_000)
        .ok_or_else(|| format!("duration {s:?} is too long"))
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp {s:?}: {e}"))
}
