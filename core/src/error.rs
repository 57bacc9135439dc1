//! Error taxonomy. Empty queries and queries with no matches are not errors;
//! they produce empty result lists.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The corpus cannot be indexed. No partial index is produced.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("duplicate location {location:?} (records {first} and {second})")]
    DuplicateLocation { location: String, first: usize, second: usize },

    #[error("malformed record {index}: {reason}")]
    Malformed { index: usize, reason: String },

    #[error("failed to parse corpus {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("failed to read corpus {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid top_k {0}: must not be negative")]
    InvalidTopK(i64),

    #[error("top_k must be an integer, got {0:?}")]
    MalformedTopK(String),

    #[error("query cancelled")]
    Cancelled,
}

/// A persisted index could not be read back. Nothing is served from it.
#[derive(Debug, Error)]
pub enum IndexFormatError {
    #[error("not a search index (unrecognised header)")]
    BadMagic,

    #[error("unsupported index format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("corrupt index: {0}")]
    Corrupt(String),

    #[error("inconsistent index: {0}")]
    Inconsistent(String),

    #[error("no index found in {0}")]
    Missing(PathBuf),

    #[error("index I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}
