//! Error types shared across the merge pipeline.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("cannot specify both included and excluded field names")]
    ConflictingFieldSelection,
    #[error("no site given")]
    MissingSite,
    #[error("unknown item type: {0}")]
    UnknownItemType(String),
    #[error("unknown item type for site <{site}>: {item}")]
    UnsupportedSiteItem { site: String, item: &'static str },
    #[error("no data files found in {0} input path(s)")]
    NoInputFiles(usize),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed reading <{}>: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed writing <{}>: {source}", path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed serialising row {row}: {source}")]
    SerialiseRow {
        row: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("configuration error: {0}")]
    Config(#[from] ortho_config::OrthoError),
}
