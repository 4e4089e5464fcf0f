//! Error types for the ingestion pipeline
//!
//! Only fatal, per-record or per-run failures live here. Data-quality
//! problems inside a posting are reported as diagnostics instead.

use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Posting {external_id} is not valid JSON: {source}")]
    InvalidDocument {
        external_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid posting id {0:?}")]
    InvalidExternalId(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("HTML parse error: {0}")]
    Html(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported stage snapshot format version {found} (expected {expected})")]
    SnapshotVersion { found: u32, expected: u32 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Record sink error: {0}")]
    Sink(String),

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IngestError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }
}

impl From<jobfeed_common::CommonError> for IngestError {
    fn from(err: jobfeed_common::CommonError) -> Self {
        match err {
            jobfeed_common::CommonError::Io(e) => Self::Io(e),
            jobfeed_common::CommonError::Serialization(e) => Self::Serialization(e),
            jobfeed_common::CommonError::Config(msg) => Self::Config(msg),
        }
    }
}
