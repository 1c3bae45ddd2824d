//! Data ingestion
//!
//! Season CSV fetching (with an optional on-disk cache), parsing and the
//! concatenated match table.

pub mod loader;
pub mod season;
pub mod table;

pub use loader::SeasonLoader;
pub use table::MatchTable;
