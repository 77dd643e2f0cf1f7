//! Core music catalog for vinyl.
//!
//! Artists, albums and tracks with their credits, plus an append-only
//! listening history, stored in SQLite. Names are matched without regard to
//! ASCII case, so concurrent "add if missing" calls converge on one row.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod catalog;
pub mod error;
pub mod model;
pub mod schema;
pub mod stats;
pub mod worker;

pub use catalog::{CatalogCounts, CatalogStore, LinkOutcome};
pub use error::{Error, ErrorKind, Result};
pub use schema::{CascadeReport, Endpoint, StoreOptions};
pub use stats::{DailyStat, Period, PeriodStats, TopItem, MAX_DAILY_SPAN};
pub use worker::AsyncCatalog;
