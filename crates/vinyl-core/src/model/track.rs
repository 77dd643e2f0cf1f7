use serde::{Deserialize, Serialize};

use crate::model::ids::TrackId;

/// A single recording in the catalog.
///
/// Titles are not unique; two tracks may share a title as long as their
/// durations differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    /// Length in milliseconds.
    pub duration_ms: i64,
}

impl Track {
    /// Duration formatted as `m:ss`.
    #[must_use]
    pub fn display_duration(&self) -> String {
        let total_secs = self.duration_ms / 1000;
        format!("{}:{:02}", total_secs / 60, total_secs % 60)
    }
}
