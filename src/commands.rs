//! Command execution for `bgmerge`.
//!
//! This module owns the runtime flow of the `merge` sub-command: resolving
//! the item type and site presets, running each merge in turn, and reporting
//! outcomes.

use std::path::PathBuf;

use chrono::Utc;
use log::{info, warn};

use crate::cli_args::MergeArgs;
use crate::errors::MergeError;
use crate::merge::{MergeOptions, MergeSummary, merge_files};
use crate::schema::ItemType;
use crate::sites::{PresetOptions, all_sites_config, site_config};

const DEFAULT_FEEDS_DIR: &str = "feeds";
const DEFAULT_DATA_DIR: &str = "data";

/// Execute the `merge` sub-command, returning one summary per merge run.
///
/// `all` expands to every known site; any other name runs a single site
/// with the CLI's path overrides applied.
///
/// # Errors
///
/// Fails on unknown item types, unsupported site/item combinations, and any
/// error from an individual merge run.
pub fn run_merge(args: &MergeArgs) -> Result<Vec<MergeSummary>, MergeError> {
    let site = args.site.as_deref().ok_or(MergeError::MissingSite)?;
    let item = args
        .item_type
        .as_deref()
        .map_or(Ok(ItemType::Game), str::parse)?;

    let opts = PresetOptions {
        item,
        in_paths: args.in_paths.clone(),
        out_path: args.out_path.clone(),
        clean_results: args.clean_results,
        latest_min_days: args.latest_min_days,
        feeds_dir: args
            .feeds_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FEEDS_DIR)),
        data_dir: args
            .data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        now: Utc::now(),
    };

    let configs = if site == "all" {
        all_sites_config(&opts)?
    } else {
        vec![site_config(site, &opts)?]
    };

    // The driver always drops empty fields; key sorting is part of cleaning.
    let merge_options = MergeOptions {
        overwrite: args.overwrite,
        drop_empty: true,
        sort_keys: args.clean_results,
        progress_bar: args.progress_bar,
    };

    let mut summaries = Vec::with_capacity(configs.len());
    for config in &configs {
        let summary = merge_files(config, merge_options)?;
        report(&summary);
        summaries.push(summary);
    }
    Ok(summaries)
}

fn report(summary: &MergeSummary) {
    let Some(path) = &summary.out_path else {
        warn!("Merge skipped: output already exists");
        return;
    };
    info!(
        "Merged {} of {} rows into <{}> ({} lines skipped)",
        summary.rows_written,
        summary.rows_read,
        path.display(),
        summary.lines_skipped
    );
}
