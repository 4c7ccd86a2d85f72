//! Error taxonomy for the import pipeline.
//!
//! Every variant is fatal for the current run. Numeric fields that fail to
//! parse are not errors at all; they become nulls in `reading::fields`.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = ImportError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Station {station_id} not found in the stations table")]
    StationNotFound { station_id: String },

    #[error(transparent)]
    Timestamp(#[from] TimestampError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("File I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Failed to download {url}: server responded {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Failed to download {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("CSV decode error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Row {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        line: u64,
        expected: usize,
        found: usize,
    },
}

#[derive(Error, Debug)]
pub enum TimestampError {
    #[error("Unknown timezone `{0}`")]
    UnknownTimezone(String),

    #[error("Invalid date/hour `{value}`: {reason}")]
    Format { value: String, reason: String },

    #[error("Local time `{0}` cannot be resolved in its timezone")]
    Unresolvable(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Batch writer is closed")]
    WriterClosed,
}
