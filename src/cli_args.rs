//! Command-line argument structures.
//!
//! Isolates clap derivations so lint expectations remain scoped, keeping
//! `main.rs` focused on runtime logic.

use std::path::PathBuf;

use clap::Parser;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

/// Serde predicate: skip serialising booleans still at their clap default,
/// so a false CLI flag cannot shadow env or config precedence.
pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

/// Options that apply to every sub-command.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

/// Parameters accepted by the `merge` sub-command.
#[derive(Parser, Deserialize, Serialize, Debug, OrthoConfig, Clone, Default)]
#[command(name = "merge")]
#[ortho_config(prefix = "BGM")]
pub struct MergeArgs {
    /// Site whose feeds should be merged, or `all` for every known site
    #[arg(required = true)]
    // Clap marks the argument as required so parsing yields `Some(value)`. The
    // `Option` allows `MergeArgs::default()` and config merging to leave it unset.
    pub site: Option<String>,
    /// Type of item to merge (GameItem, UserItem or RatingItem)
    #[arg(short = 't', long, value_name = "ITEM")]
    pub item_type: Option<String>,
    /// Paths to input files or directories
    #[arg(short = 'i', long = "in-paths", value_name = "PATH", num_args = 0..)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub in_paths: Vec<PathBuf>,
    /// Path to the output file
    #[arg(short = 'o', long, value_name = "PATH")]
    pub out_path: Option<PathBuf>,
    /// Remove empty fields, sort keys alphabetically and sort rows
    #[arg(short = 'c', long)]
    #[serde(default, skip_serializing_if = "crate::cli_args::is_false")]
    pub clean_results: bool,
    /// Only keep rows scraped within the given number of days
    #[arg(short = 'm', long, value_name = "DAYS")]
    pub latest_min_days: Option<f64>,
    /// Overwrite the output file if it exists
    #[arg(short = 'W', long)]
    #[serde(default, skip_serializing_if = "crate::cli_args::is_false")]
    pub overwrite: bool,
    /// Show a progress bar while writing
    #[arg(short = 'p', long)]
    #[serde(default, skip_serializing_if = "crate::cli_args::is_false")]
    pub progress_bar: bool,
    /// Directory holding scraped feeds (one sub-directory per site)
    #[arg(long, value_name = "DIR")]
    pub feeds_dir: Option<PathBuf>,
    /// Directory receiving cleaned data files
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}
