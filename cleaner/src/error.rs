//! Error types for the cleaning job and the artifact stores.
//!
//! - [`DatasetError`] - CSV loading, writing and column errors
//! - [`ArtifactError`] - Artifact store errors (local and HTTP)
//! - [`JobError`] - Top-level cleaning job errors
//! - [`ServerError`] - HTTP artifact server errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Dataset Errors
// =============================================================================

/// Errors while reading, transforming or writing a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Failed to read or write a file.
    #[error("Dataset IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Content could not be decoded.
    #[error("Failed to decode content: {0}")]
    Encoding(String),

    /// Malformed CSV.
    #[error("Invalid CSV at line {line}: {message}")]
    Csv { line: usize, message: String },

    /// Empty file (no header row).
    #[error("CSV file is empty")]
    EmptyFile,

    /// A column the job relies on is absent.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A cell that must be numeric is not.
    #[error("Line {line}, column '{column}': '{value}' is not a number")]
    InvalidNumber {
        line: usize,
        column: String,
        value: String,
    },
}

impl From<csv::Error> for DatasetError {
    fn from(err: csv::Error) -> Self {
        let line = err
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(0);
        DatasetError::Csv {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Artifact Store Errors
// =============================================================================

/// Errors from an artifact store.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Reference string could not be parsed.
    #[error("Invalid artifact reference '{0}'")]
    InvalidReference(String),

    /// Artifact or version does not exist.
    #[error("Artifact not found: {0}")]
    NotFound(String),

    /// Run id is unknown to the store.
    #[error("Run not found: {0}")]
    RunNotFound(String),

    /// Caller asked for the single payload file of a multi-file artifact.
    #[error("Artifact {reference} has {count} files, expected exactly one")]
    NotSingleFile { reference: String, count: usize },

    /// Artifact or file name contains forbidden characters.
    #[error("Invalid name '{0}': only letters, digits, '.', '_' and '-' are allowed")]
    InvalidName(String),

    /// Downloaded content does not match the manifest.
    #[error("Digest mismatch for file '{file}' of {reference}")]
    DigestMismatch { reference: String, file: String },

    /// Local filesystem error.
    #[error("Artifact store IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest or run record (de)serialization error.
    #[error("Artifact store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport failure.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Remote store answered with an error status.
    #[error("Artifact server returned {status}: {message}")]
    Server { status: u16, message: String },
}

impl From<reqwest::Error> for ArtifactError {
    fn from(err: reqwest::Error) -> Self {
        ArtifactError::Http(err.to_string())
    }
}

// =============================================================================
// Job Errors (top-level)
// =============================================================================

/// Top-level cleaning job errors.
///
/// This is the error type returned by [`crate::job::run_cleaning`].
#[derive(Debug, Error)]
pub enum JobError {
    /// Dataset error.
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// Artifact store error.
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    /// Temporary output file error.
    #[error("Output file error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Store error.
    #[error("{0}")]
    Artifact(#[from] ArtifactError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Result type for artifact store operations.
pub type ArtifactResult<T> = Result<T, ArtifactError>;

/// Result type for the cleaning job.
pub type JobResult<T> = Result<T, JobError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let dataset_err = DatasetError::MissingColumn("price".into());
        let job_err: JobError = dataset_err.into();
        assert!(job_err.to_string().contains("price"));

        let artifact_err = ArtifactError::NotFound("sample.csv:v3".into());
        let job_err: JobError = artifact_err.into();
        assert!(job_err.to_string().contains("sample.csv:v3"));
    }

    #[test]
    fn test_invalid_number_format() {
        let err = DatasetError::InvalidNumber {
            line: 7,
            column: "price".into(),
            value: "cheap".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Line 7"));
        assert!(msg.contains("'price'"));
        assert!(msg.contains("'cheap'"));
    }

    #[test]
    fn test_not_single_file_format() {
        let err = ArtifactError::NotSingleFile {
            reference: "raw:v0".into(),
            count: 2,
        };
        assert!(err.to_string().contains("2 files"));
    }
}
