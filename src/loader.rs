//! NDJSON input discovery and parsing.
//!
//! Input paths may name files or feed directories. Directories expand
//! (non-recursively, in file-name order) to the data files they contain.
//! Malformed lines are skipped with a logged warning and counted so no row
//! disappears silently.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde_json::Value;

use crate::errors::MergeError;
use crate::schema::{Record, Schema};

const DATA_EXTENSIONS: [&str; 3] = ["jl", "jsonl", "ndjson"];

/// Parsed rows plus the number of lines rejected on the way in.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub rows: Vec<Record>,
    pub lines_skipped: usize,
}

/// Expand input paths into the concrete list of data files to read.
///
/// Nonexistent paths are skipped with a warning; an empty result is an
/// error because a merge over nothing almost always signals a wrong path.
///
/// # Errors
///
/// Returns [`MergeError::ReadFile`] when a directory cannot be listed and
/// [`MergeError::NoInputFiles`] when expansion yields no files.
pub fn resolve_input_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>, MergeError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
                .map_err(|source| MergeError::ReadFile {
                    path: path.clone(),
                    source,
                })?
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|candidate| candidate.is_file() && has_data_extension(candidate))
                .collect();
            entries.sort();
            files.extend(entries);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            warn!("Input path <{}> does not exist, skipping", path.display());
        }
    }
    if files.is_empty() {
        return Err(MergeError::NoInputFiles(paths.len()));
    }
    Ok(files)
}

fn has_data_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DATA_EXTENSIONS.contains(&ext))
}

/// Read every file line by line, coercing each JSON object against `schema`.
///
/// # Errors
///
/// Returns [`MergeError::ReadFile`] on I/O failures. Individual lines that
/// fail to parse, or parse to something other than an object, are counted in
/// [`LoadOutcome::lines_skipped`] instead of failing the run.
pub fn load_records(files: &[PathBuf], schema: &Schema) -> Result<LoadOutcome, MergeError> {
    let mut outcome = LoadOutcome::default();
    for path in files {
        let file = File::open(path).map_err(|source| MergeError::ReadFile {
            path: path.clone(),
            source,
        })?;
        let before = outcome.rows.len();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| MergeError::ReadFile {
                path: path.clone(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(&line) {
                Ok(value) => match schema.coerce_row(value) {
                    Some(row) => outcome.rows.push(row),
                    None => {
                        outcome.lines_skipped += 1;
                        warn!(
                            "Skipping non-object row at {}:{}",
                            path.display(),
                            index + 1
                        );
                    }
                },
                Err(err) => {
                    outcome.lines_skipped += 1;
                    warn!(
                        "Skipping unparseable row at {}:{}: {err}",
                        path.display(),
                        index + 1
                    );
                }
            }
        }
        debug!(
            "Read {} rows from <{}>",
            outcome.rows.len() - before,
            path.display()
        );
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ItemType;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn resolves_directories_to_sorted_data_files() {
        let dir = tempdir().expect("create temp dir");
        fs::write(dir.path().join("b.jl"), "").expect("write");
        fs::write(dir.path().join("a.jsonl"), "").expect("write");
        fs::write(dir.path().join("notes.txt"), "").expect("write");
        fs::create_dir(dir.path().join("nested")).expect("mkdir");

        let files = resolve_input_files(&[dir.path().to_owned()]).expect("resolve");
        let names: Vec<_> = files
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["a.jsonl", "b.jl"]);
    }

    #[test]
    fn empty_expansion_is_an_error() {
        let dir = tempdir().expect("create temp dir");
        fs::write(dir.path().join("notes.txt"), "").expect("write");
        let err = resolve_input_files(&[dir.path().to_owned()]).expect_err("no data files");
        assert!(matches!(err, MergeError::NoInputFiles(1)));
    }

    #[test]
    fn missing_paths_are_skipped_not_fatal() {
        let dir = tempdir().expect("create temp dir");
        let real = dir.path().join("data.jl");
        fs::write(&real, "").expect("write");
        let files = resolve_input_files(&[dir.path().join("missing.jl"), real.clone()])
            .expect("resolve");
        assert_eq!(files, vec![real]);
    }

    #[test]
    fn bad_lines_are_counted_not_fatal() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("data.jl");
        fs::write(
            &path,
            concat!(
                "{\"bgg_id\": 1, \"name\": \"Azul\"}\n",
                "not json\n",
                "[1, 2, 3]\n",
                "\n",
                "{\"bgg_id\": 2}\n",
            ),
        )
        .expect("write");

        let outcome =
            load_records(&[path], &ItemType::Game.schema()).expect("load");
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.lines_skipped, 2);
    }
}
