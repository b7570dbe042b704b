//! Error types for grid construction, clipping and counting.

use thiserror::Error;

/// Errors raised by the segmentation core.
#[derive(Error, Debug)]
pub enum GridError {
    /// Degenerate or self-intersecting geometry, or a non-positive cell size.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// An input that must be non-empty for the result to mean anything.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Auxiliary attribute values that disagree with the declared names.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A tuning parameter outside its valid range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// IO error while reading or writing feature files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON output or summary.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Feature file that is not valid GeoJSON, or holds an unsupported
    /// geometry.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Coordinate reference system setup or transform failure.
    #[error("Projection error: {0}")]
    Projection(String),

    /// CSV export failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for segmentation operations.
pub type Result<T> = std::result::Result<T, GridError>;
