use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Spend data could not be turned into any usable record.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The spend file could not be read.
    #[error("failed to read spend data from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No header column matched one of the required synonym sets.
    #[error("no {column} column found in header (expected one of: {expected})")]
    MissingColumn {
        column: &'static str,
        expected: String,
    },

    /// Header was fine but no row produced a business.
    #[error("spend data contains no usable rows")]
    NoRecords,
}

/// An evidence upload batch was rejected. Nothing from the batch was kept.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("failed to read evidence document {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("evidence path {0:?} has no file name")]
    Unnamed(PathBuf),
}

/// Failure at the boundary of an outbound generation service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request to generation service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generation service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("generation service response had no usable content: {0}")]
    EmptyResponse(String),
}

/// The drafting phase failed; the whole proposal attempt is abandoned.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("model response is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("model response is missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("model response does not match the proposal schema: {0}")]
    SchemaMismatch(#[source] serde_json::Error),
}
