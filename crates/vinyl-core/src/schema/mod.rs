pub mod cascade;
pub mod db;
pub mod migrations;

pub use cascade::{CascadeReport, Endpoint};
pub use db::{Database, StoreOptions};
