pub mod album;
pub mod artist;
pub mod ids;
pub mod play;
pub mod track;

pub use album::{Album, Cover, DEFAULT_MAX_COVER_BYTES};
pub use artist::{Artist, Credit, DEFAULT_ROLE, FEATURED_ROLE};
pub use ids::{AlbumId, ArtistId, PlayId, TrackId};
pub use play::{Play, PlayCount};
pub use track::Track;
