use serde::{Deserialize, Serialize};

use crate::model::ids::ArtistId;

/// Role given to a track credit when the caller does not name one.
pub const DEFAULT_ROLE: &str = "main";

/// Role for guest performers ("feat." credits).
pub const FEATURED_ROLE: &str = "featured";

/// A performer, band, or other credited name.
///
/// Names are unique under case-insensitive comparison: "Daft Punk" and
/// "DAFT PUNK" are the same artist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
}

/// An artist as credited on one track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    pub artist: Artist,
    pub role: String,
}

impl Credit {
    #[must_use]
    pub fn is_main(&self) -> bool {
        self.role == DEFAULT_ROLE
    }
}
