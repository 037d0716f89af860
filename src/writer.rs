//! NDJSON output with optional row cleaning and progress reporting.
//!
//! Rows serialise compactly, one JSON object per line. Cleaning happens at
//! write time so the merge pipeline never mutates its working set: empty
//! fields can be dropped and keys sorted alphabetically (at every nesting
//! level, matching `sort_keys` in common JSON writers).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;

use crate::errors::MergeError;
use crate::schema::Record;

#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    pub drop_empty: bool,
    pub sort_keys: bool,
    pub progress_bar: bool,
}

impl WriteOptions {
    fn cleans(self) -> bool {
        self.drop_empty || self.sort_keys
    }
}

/// Write rows to `path` as NDJSON, returning the number of rows written.
///
/// # Errors
///
/// Returns [`MergeError::WriteFile`] when the file cannot be created or
/// written, and [`MergeError::SerialiseRow`] when a row fails to serialise.
pub fn write_ndjson(
    path: &Path,
    rows: &[Record],
    options: WriteOptions,
) -> Result<usize, MergeError> {
    // Default output paths nest under the feed or data directory.
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| MergeError::WriteFile {
            path: path.to_owned(),
            source,
        })?;
    }
    let file = File::create(path).map_err(|source| MergeError::WriteFile {
        path: path.to_owned(),
        source,
    })?;
    let mut out = BufWriter::new(file);
    let progress = options
        .progress_bar
        .then(|| row_progress_bar(rows.len() as u64));

    let write_context = |source| MergeError::WriteFile {
        path: path.to_owned(),
        source,
    };

    let mut written = 0usize;
    for (index, row) in rows.iter().enumerate() {
        if options.cleans() {
            let cleaned = clean_row(row, options);
            serde_json::to_writer(&mut out, &cleaned)
        } else {
            serde_json::to_writer(&mut out, row)
        }
        .map_err(|source| MergeError::SerialiseRow { row: index, source })?;
        out.write_all(b"\n").map_err(write_context)?;
        written += 1;
        if let Some(pb) = &progress {
            pb.inc(1);
        }
    }
    out.flush().map_err(write_context)?;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    Ok(written)
}

/// Falsy under the cleaning rule: null, false, zero, empty string, empty
/// container.
#[expect(clippy::float_cmp, reason = "zero is exactly representable")]
pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !*b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn clean_row(row: &Record, options: WriteOptions) -> Record {
    let mut pairs: Vec<(&str, &Value)> = row
        .iter()
        .map(|(k, v)| (k.as_str(), v))
        .filter(|(_, v)| !options.drop_empty || !is_empty_value(v))
        .collect();
    if options.sort_keys {
        pairs.sort_by_key(|(k, _)| *k);
        return pairs
            .into_iter()
            .map(|(k, v)| (k.to_owned(), sort_value_keys(v)))
            .collect();
    }
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.clone()))
        .collect()
}

fn sort_value_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<(&str, &Value)> =
                map.iter().map(|(k, v)| (k.as_str(), v)).collect();
            pairs.sort_by_key(|(k, _)| *k);
            Value::Object(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.to_owned(), sort_value_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_value_keys).collect()),
        other => other.clone(),
    }
}

fn row_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {wide_bar} {pos}/{len} rows ({eta})")
            .expect("valid progress template"),
    );
    pb
}
