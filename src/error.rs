//! Error types for loading and exporting inspection data.
//!
//! Only structural problems end up here. Malformed cells, missing columns
//! and empty views are absorbed by the pipeline itself.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Input file does not exist.
    #[error("CSV file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Input file exists but could not be read.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input file is above the configured upload ceiling.
    #[error("file {path} is {size} bytes, above the {max_size} byte limit")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// Every candidate encoding failed to decode or parse the payload.
    #[error("no encoding matched (tried {})", .attempts.join(", "))]
    NoEncodingMatched { attempts: Vec<String> },

    /// The payload has no header row or no named columns.
    #[error("input has no columns")]
    NoColumns,

    /// The payload has a header but no data rows.
    #[error("input has no data rows")]
    EmptyDataset,

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, ProcessorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProcessorError::FileNotFound {
            path: PathBuf::from("/data/inspecciones.csv"),
        };
        assert_eq!(err.to_string(), "CSV file not found: /data/inspecciones.csv");
    }

    #[test]
    fn test_no_encoding_lists_attempts() {
        let err = ProcessorError::NoEncodingMatched {
            attempts: vec!["utf-8".to_string(), "latin-1".to_string()],
        };
        assert_eq!(err.to_string(), "no encoding matched (tried utf-8, latin-1)");
    }
}
