//! Merge scraped board game data feeds into consolidated NDJSON files.
//!
//! Feeds accumulate one row per scrape, so the same game, user or rating
//! appears many times. A merge run groups rows by an identity key, keeps the
//! most recently scraped row per group, and writes the result back out,
//! optionally cleaned for publication. Site presets in [`sites`] encode the
//! canonical configuration for each scraped source.

pub mod cli_args;
pub mod commands;
pub mod config;
pub mod errors;
pub mod key;
pub mod loader;
pub mod merge;
pub mod schema;
pub mod sites;
pub mod writer;

pub use errors::MergeError;
pub use key::{KeyExpr, KeyValue};
pub use merge::{MergeConfig, MergeOptions, MergeSummary, merge_files};
pub use schema::{ItemType, Record, Schema};
pub use sites::{ALL_SITES, PresetOptions, all_sites_config, site_config};
