pub mod history;
pub mod identity;
pub mod relations;
pub mod store;

pub use relations::LinkOutcome;
pub use store::{CatalogCounts, CatalogStore};
