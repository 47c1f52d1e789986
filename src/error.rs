use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the loading, analysis and plotting stages.
///
/// Invalid sensor readings are not errors; they are zero-filled by the
/// validity rule in [`crate::data::model`].
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Input file missing, unreadable or malformed.
    #[error("failed to load {}: {reason}", .path.display())]
    Load { path: PathBuf, reason: String },

    /// Requested window runs past the end of the table.
    #[error("window of {offset} steps from {start} exceeds table length {len}")]
    Index {
        start: usize,
        offset: usize,
        len: usize,
    },

    /// Row index one past the last row of the average matrix.
    #[error("row {row} is out of bounds for the average matrix ({rows} rows)")]
    RowIndex { row: usize, rows: usize },

    /// Row derived from a sensor id is larger than the average matrix.
    #[error("row {row} is larger than the average matrix ({rows} rows)")]
    Range { row: usize, rows: usize },

    /// Inconsistent arguments (series/label counts, zero stride, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The table has no `Value`/`Status` columns for this sensor.
    #[error("sensor {0} is not present in the dataset")]
    UnknownSensor(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Chart backend or image encoder failure.
    #[error("render error: {0}")]
    Render(String),
}

/// Type alias for Results using AnalysisError
pub type Result<T> = std::result::Result<T, AnalysisError>;
