//! Error types for territorio.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Configuration errors (fatal for a run)
    #[error("Boundary dataset {source_id} contains no usable territories")]
    EmptyBoundaryDataset { source_id: String },

    #[error("Column '{column}' not found in worksheet header")]
    MissingColumn { column: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    // Boundary data errors
    #[error("Invalid boundary data in {source_id}: {reason}")]
    InvalidBoundaryData { source_id: String, reason: String },

    #[error("Nearest-centroid lookup returned unknown territory {index}")]
    UnknownTerritory { index: usize },

    // Sheet API errors
    #[error("Sheets API request failed with status {status}: {body}")]
    Sheets { status: u16, body: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
