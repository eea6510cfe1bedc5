//! Error types for the load pipeline.
//!
//! Record-level problems (`RecordError`) are recoverable inside a log file;
//! `LoadError` fails a whole file; `BatchError` is what the operator sees.

use std::path::PathBuf;
use thiserror::Error;

use crate::time::MAX_TIMESTAMP_MS;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("invalid timestamp {0}: must be within 0..={max} epoch ms", max = MAX_TIMESTAMP_MS)]
    InvalidTimestamp(i64),
}

impl From<serde_json::Error> for RecordError {
    fn from(e: serde_json::Error) -> Self {
        RecordError::Malformed(e.to_string())
    }
}

/// Insert, lookup or commit rejected by the storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: RecordError,
    },

    #[error("storage failure while loading {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: StorageError,
    },
}

impl LoadError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            LoadError::Io { path, .. }
            | LoadError::Malformed { path, .. }
            | LoadError::Storage { path, .. } => path,
        }
    }
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to list files under {}: {reason}", .root.display())]
    Discovery { root: PathBuf, reason: String },

    #[error("aborted at file {index}/{total}: {source}")]
    Aborted {
        index: usize,
        total: usize,
        #[source]
        source: LoadError,
    },

    #[error("rollback after failed file {} also failed: {source}", .path.display())]
    Rollback {
        path: PathBuf,
        #[source]
        source: StorageError,
    },
}
