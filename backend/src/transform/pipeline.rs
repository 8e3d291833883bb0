//! High-level ingestion API: CSV in, committed rows out.
//!
//! The whole file is parsed and mapped before a transaction is opened, so a
//! stream error never needs a rollback.
//!
//! # Example
//!
//! ```rust,ignore
//! use quoteload::{ingest_path, DatabaseSettings, PgQuoteStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PgQuoteStore::connect(&DatabaseSettings::from_env()?).await?;
//!     let report = ingest_path(&store, "quotes.csv".as_ref(), std::future::pending::<()>()).await?;
//!     println!("Loaded {} rows", report.committed);
//!     Ok(())
//! }
//! ```

use serde::Serialize;
use std::future::Future;
use std::io::Read;
use std::path::Path;

use super::mapper::{missing_columns, QuoteMapper};
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::error::{CsvError, CsvResult, PipelineResult};
use crate::loader::Loader;
use crate::models::QuoteRecord;
use crate::parser::RecordReader;
use crate::store::QuoteStore;

/// A fully parsed and mapped input file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedBatch {
    /// Header line as found in the file.
    pub headers: Vec<String>,
    /// Expected columns the header does not provide.
    pub missing_columns: Vec<String>,
    /// Non-empty cells that degraded to NULL.
    pub malformed_cells: usize,
    /// Mapped records in input order.
    pub records: Vec<QuoteRecord>,
}

/// Summary of a committed ingestion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub headers: Vec<String>,
    pub missing_columns: Vec<String>,
    pub malformed_cells: usize,
    pub rows_read: usize,
    pub committed: usize,
}

/// Parse and map every row of `reader`.
pub fn read_batch<R: Read>(reader: R) -> CsvResult<ParsedBatch> {
    let mut rows = RecordReader::new(reader)?;

    let headers: Vec<String> = match rows.read_headers()? {
        Some(h) => h.to_vec(),
        None => {
            log_warning("No header line found, nothing to load");
            return Ok(ParsedBatch::default());
        }
    };

    let missing: Vec<String> = missing_columns(&headers).into_iter().map(String::from).collect();

    let mut mapper = QuoteMapper::new();
    let mut records = Vec::new();
    for row in rows {
        records.push(mapper.map(&row?));
    }

    Ok(ParsedBatch {
        headers,
        missing_columns: missing,
        malformed_cells: mapper.malformed_cells(),
        records,
    })
}

/// Parse and map a CSV file without touching storage.
pub async fn parse_path(path: &Path) -> CsvResult<ParsedBatch> {
    log_info(format!("Reading {}", path.display()));
    let bytes = tokio::fs::read(path).await.map_err(CsvError::Io)?;
    let batch = read_batch(bytes.as_slice())?;
    log_batch(&batch);
    Ok(batch)
}

/// Load an already parsed batch: ensure the table, then one transaction.
pub async fn ingest<S, F>(store: &S, batch: ParsedBatch, shutdown: F) -> PipelineResult<IngestReport>
where
    S: QuoteStore,
    F: Future + Send,
{
    let loader = Loader::new(store);
    loader.ensure_schema().await?;

    let rows_read = batch.records.len();
    let report = loader.load_all_until(batch.records, shutdown).await?;

    Ok(IngestReport {
        headers: batch.headers,
        missing_columns: batch.missing_columns,
        malformed_cells: batch.malformed_cells,
        rows_read,
        committed: report.committed,
    })
}

/// Parse CSV bytes and load them in one transaction.
pub async fn ingest_bytes<S, F>(store: &S, bytes: &[u8], shutdown: F) -> PipelineResult<IngestReport>
where
    S: QuoteStore,
    F: Future + Send,
{
    let batch = read_batch(bytes)?;
    log_batch(&batch);
    ingest(store, batch, shutdown).await
}

/// Parse a CSV file and load it in one transaction.
pub async fn ingest_path<S, F>(store: &S, path: &Path, shutdown: F) -> PipelineResult<IngestReport>
where
    S: QuoteStore,
    F: Future + Send,
{
    let batch = parse_path(path).await?;
    ingest(store, batch, shutdown).await
}

fn log_batch(batch: &ParsedBatch) {
    log_success(format!("Read {} rows", batch.records.len()));
    log_info(format!("{} columns:", batch.headers.len()));
    for (i, col) in batch.headers.iter().enumerate() {
        log_info_indent(format!("[{:2}] {}", i + 1, col), 1);
    }
    if !batch.missing_columns.is_empty() {
        log_warning(format!(
            "Missing columns will be stored as NULL: {}",
            batch.missing_columns.join(", ")
        ));
    }
    if batch.malformed_cells > 0 {
        log_warning(format!("{} malformed cells stored as NULL", batch.malformed_cells));
    }
}
