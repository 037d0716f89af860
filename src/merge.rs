//! The merge pipeline: filter, keep-latest dedupe, sort, select, write.
//!
//! A merge run collapses every group of rows sharing a key to the single
//! most recently scraped row. The pipeline is deterministic: identical input
//! order and configuration produce identical output, because the recency
//! sort is stable and ties keep their input order.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde_json::Value;

use crate::errors::MergeError;
use crate::key::{KeyExpr, KeyValue, eval_key};
use crate::loader::{load_records, resolve_input_files};
use crate::schema::{Record, Schema};
use crate::writer::{WriteOptions, write_ndjson};

const MAX_DISPLAY_ITEMS: usize = 10;

/// Everything one merge run needs to know: where rows come from, how they
/// group, which of a group survives, and how the output is shaped.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    pub schema: Schema,
    pub in_paths: Vec<PathBuf>,
    pub out_path: PathBuf,
    /// Columns forming the identity key; rows sharing a key merge.
    pub key_cols: Vec<KeyExpr>,
    /// Columns ranking recency; the greatest value wins its group.
    pub latest_cols: Vec<KeyExpr>,
    /// Drop rows whose first latest column is null or before this cutoff.
    pub latest_min: Option<DateTime<Utc>>,
    pub sort_fields: Option<Vec<KeyExpr>>,
    pub sort_descending: bool,
    pub fieldnames_include: Option<Vec<String>>,
    pub fieldnames_exclude: Option<Vec<String>>,
}

/// Behaviour toggles that vary per invocation rather than per site.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    pub overwrite: bool,
    pub drop_empty: bool,
    pub sort_keys: bool,
    pub progress_bar: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    pub rows_read: usize,
    pub lines_skipped: usize,
    pub rows_written: usize,
    /// `None` when the overwrite guard skipped the run.
    pub out_path: Option<PathBuf>,
}

/// Run one merge.
///
/// # Errors
///
/// Returns [`MergeError::ConflictingFieldSelection`] when both an include and
/// an exclude list are configured, and propagates loader and writer failures.
/// An existing output without the overwrite option is not an error: the run
/// logs a warning and reports no output path.
pub fn merge_files(
    config: &MergeConfig,
    options: MergeOptions,
) -> Result<MergeSummary, MergeError> {
    if config.fieldnames_include.is_some() && config.fieldnames_exclude.is_some() {
        return Err(MergeError::ConflictingFieldSelection);
    }

    info!(
        "Merging items from {} into <{}>",
        describe_inputs(&config.in_paths),
        config.out_path.display()
    );

    if !options.overwrite && config.out_path.exists() {
        warn!("Output file already exists, use overwrite to replace it");
        return Ok(MergeSummary {
            rows_read: 0,
            lines_skipped: 0,
            rows_written: 0,
            out_path: None,
        });
    }

    let files = resolve_input_files(&config.in_paths)?;
    let outcome = load_records(&files, &config.schema)?;
    let rows_read = outcome.rows.len();
    let mut rows = outcome.rows;

    if let Some(cutoff) = config.latest_min {
        info!("Filtering out rows before <{cutoff}>");
        let latest = config.latest_cols.first();
        rows.retain(|row| {
            latest.is_some_and(|expr| matches!(expr.eval(row), KeyValue::Time(t) if t >= cutoff))
        });
    }

    info!(
        "Merging rows with identical keys: {:?}",
        column_names(&config.key_cols)
    );
    info!("Keeping latest by: {:?}", column_names(&config.latest_cols));
    rows = keep_latest(rows, &config.key_cols, &config.latest_cols);

    if let Some(sort_fields) = &config.sort_fields {
        info!(
            "Sorting data by: {:?} ({})",
            column_names(sort_fields),
            if config.sort_descending {
                "descending"
            } else {
                "ascending"
            }
        );
        rows = sort_rows(rows, sort_fields, config.sort_descending);
    }

    match (&config.fieldnames_include, &config.fieldnames_exclude) {
        (Some(include), _) => {
            info!("Selecting fields: {include:?}");
            rows = rows
                .into_iter()
                .map(|row| select_fields(row, include))
                .collect();
        }
        (_, Some(exclude)) => {
            info!("Excluding fields: {exclude:?}");
            for row in &mut rows {
                for name in exclude {
                    row.remove(name);
                }
            }
        }
        _ => {}
    }

    info!("Writing merged data to <{}>", config.out_path.display());
    let rows_written = write_ndjson(
        &config.out_path,
        &rows,
        WriteOptions {
            drop_empty: options.drop_empty,
            sort_keys: options.sort_keys,
            progress_bar: options.progress_bar,
        },
    )?;
    info!("Done.");

    Ok(MergeSummary {
        rows_read,
        lines_skipped: outcome.lines_skipped,
        rows_written,
        out_path: Some(config.out_path.clone()),
    })
}

fn describe_inputs(paths: &[PathBuf]) -> String {
    if paths.len() > MAX_DISPLAY_ITEMS {
        format!("[{} paths]", paths.len())
    } else {
        format!("{paths:?}")
    }
}

fn column_names(exprs: &[KeyExpr]) -> Vec<&str> {
    exprs.iter().map(KeyExpr::name).collect()
}

/// Keep the most recent row per distinct key.
///
/// Rows sort by the latest columns, descending with nulls last; the stable
/// sort preserves input order among ties, then the first row per key wins.
fn keep_latest(rows: Vec<Record>, key_cols: &[KeyExpr], latest_cols: &[KeyExpr]) -> Vec<Record> {
    let mut decorated: Vec<(Vec<KeyValue>, Record)> = rows
        .into_iter()
        .map(|row| (eval_key(latest_cols, &row), row))
        .collect();
    decorated.sort_by(|(a, _), (b, _)| latest_descending(a, b));

    let mut seen: HashSet<Vec<KeyValue>> = HashSet::new();
    let mut result = Vec::with_capacity(decorated.len());
    for (_, row) in decorated {
        if seen.insert(eval_key(key_cols, &row)) {
            result.push(row);
        }
    }
    result
}

/// Component-wise descending order with nulls last.
fn latest_descending(a: &[KeyValue], b: &[KeyValue]) -> Ordering {
    for (left, right) in a.iter().zip(b.iter()) {
        let ord = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => right.cmp(left),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn sort_rows(rows: Vec<Record>, sort_fields: &[KeyExpr], descending: bool) -> Vec<Record> {
    let mut decorated: Vec<(Vec<KeyValue>, Record)> = rows
        .into_iter()
        .map(|row| (eval_key(sort_fields, &row), row))
        .collect();
    decorated.sort_by(|(a, _), (b, _)| compare_sort_keys(a, b, descending));
    decorated.into_iter().map(|(_, row)| row).collect()
}

/// Component-wise order with the engine default of nulls first in both
/// directions.
fn compare_sort_keys(a: &[KeyValue], b: &[KeyValue], descending: bool) -> Ordering {
    for (left, right) in a.iter().zip(b.iter()) {
        let ord = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => {
                if descending {
                    right.cmp(left)
                } else {
                    left.cmp(right)
                }
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Rebuild a row with exactly the named fields, in the named order. Fields
/// absent from the row appear as null, mirroring a column selection.
fn select_fields(mut row: Record, include: &[String]) -> Record {
    include
        .iter()
        .map(|name| (name.clone(), row.remove(name).unwrap_or(Value::Null)))
        .collect()
}
