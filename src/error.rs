//! Error type shared by every membermatch operation.

use std::path::PathBuf;
use thiserror::Error;

use crate::vector::VectorError;

#[derive(Error, Debug)]
pub enum MatchError {
    /// The sample step found nothing to seed the search with
    #[error("No patient record has a populated {path} field")]
    NoEmbeddedRecords { path: &'static str },

    #[error("Malformed patient record {id}: {reason}")]
    MalformedRecord { id: String, reason: String },

    #[error("Patient record not found: {0}")]
    RecordNotFound(String),

    #[error("Invalid search parameters: {0}")]
    InvalidQuery(String),

    #[error("Missing setting: {0}")]
    MissingSetting(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Embedding request failed: {0}")]
    Embedding(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Vector(#[from] VectorError),

    #[error("Snapshot '{}' could not be accessed: {source}", path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot format error: {0}")]
    SnapshotFormat(#[from] serde_json::Error),
}
