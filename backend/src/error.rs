//! Error types for the Quoteload ingestion pipeline.
//!
//! One enum per layer, converted upwards with `From` so `?` works across
//! boundaries:
//!
//! - [`CsvError`] - the input stream could not be read
//! - [`StoreError`] - the storage collaborator failed
//! - [`ConfigError`] - environment / CLI configuration problems
//! - [`LoadError`] - outcome of one transactional load
//! - [`PipelineError`] - top-level orchestration errors
//!
//! A cell that fails to normalize is not an error: it becomes `None`.

use thiserror::Error;

// =============================================================================
// CSV Stream Errors
// =============================================================================

/// Errors while reading the CSV stream.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to open or read the source.
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// The framing layer gave up on the stream.
    #[error("Unreadable CSV at line {line}: {message}")]
    Parse { line: u64, message: String },
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        match err.into_kind() {
            csv::ErrorKind::Io(io) => CsvError::Io(io),
            other => CsvError::Parse {
                line,
                message: format!("{:?}", other),
            },
        }
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not connect or acquire a connection.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Destination table could not be created.
    #[error("Schema bootstrap failed: {0}")]
    Schema(String),

    /// A single row was rejected.
    #[error("Insert of row {index} failed: {message}")]
    Insert { index: usize, message: String },

    /// Begin / commit / rollback failed.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Returning connections to the pool failed.
    #[error("Failed to release storage: {0}")]
    Release(String),

    /// Table name is not a plain SQL identifier.
    #[error("Invalid table name: '{0}'")]
    InvalidTable(String),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while assembling runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Variable is set but cannot be parsed.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    /// Table name rejected.
    #[error("Invalid table name: '{0}'")]
    InvalidTable(String),
}

// =============================================================================
// Load Errors
// =============================================================================

/// Terminal failure of one load invocation.
///
/// Every variant except [`LoadError::Schema`] and [`LoadError::Begin`] means a
/// transaction was opened and then rolled back: nothing from the batch remains
/// in storage.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Table creation failed; no load attempted.
    #[error("Schema error: {0}")]
    Schema(#[source] StoreError),

    /// The transaction could not be opened.
    #[error("Could not open transaction: {0}")]
    Begin(#[source] StoreError),

    /// Row `index` (0-based, input order) failed; batch rolled back.
    #[error("Row {index} failed, batch rolled back: {source}")]
    Insert {
        index: usize,
        #[source]
        source: StoreError,
    },

    /// Commit failed; the engine discards the transaction.
    #[error("Commit failed: {0}")]
    Commit(#[source] StoreError),

    /// Shutdown was requested mid-batch; batch rolled back.
    #[error("Load cancelled after {inserted} staged rows, batch rolled back")]
    Cancelled { inserted: usize },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors returned by [`crate::transform::pipeline`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// The load failed and was rolled back.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Storage failed outside of a load (connect, ping).
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Bad configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Writing output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for a load invocation.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_conversion_chain() {
        let csv_err = CsvError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"));
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("disk gone"));

        let load_err = LoadError::Cancelled { inserted: 4 };
        let pipeline_err: PipelineError = load_err.into();
        assert!(pipeline_err.to_string().contains("4 staged rows"));
    }

    #[test]
    fn test_insert_error_keeps_cause() {
        let err = LoadError::Insert {
            index: 2,
            source: StoreError::Insert {
                index: 2,
                message: "value too long".into(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("Row 2"));
        assert!(msg.contains("rolled back"));
        assert!(err.source().unwrap().to_string().contains("value too long"));
    }

    #[test]
    fn test_csv_io_error_maps_to_io_variant() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated");
        let err: CsvError = csv::Error::from(io).into();
        assert!(matches!(err, CsvError::Io(_)));
    }
}
