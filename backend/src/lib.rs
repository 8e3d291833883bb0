//! # Quoteload - atomic CSV ingestion of daily equity quotes
//!
//! Quoteload reads exchange quote exports (bhavcopy-style CSV with comment
//! lines, byte-order marks, quoted cells and thousands separators) and loads
//! them into PostgreSQL as a single transaction: either every row is
//! committed or none is.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│   Mapper    │────▶│   Loader    │
//! │ (BOM, #...) │     │  (RawRow)   │     │(QuoteRecord)│     │ (1 txn)     │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use quoteload::{ingest_path, DatabaseSettings, PgQuoteStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = PgQuoteStore::connect(&DatabaseSettings::from_env().unwrap()).await.unwrap();
//!     let report = ingest_path(&store, "quotes.csv".as_ref(), tokio::signal::ctrl_c()).await.unwrap();
//!     println!("Committed {} rows", report.committed);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per layer
//! - [`models`] - Quote records and dates
//! - [`parser`] - CSV framing
//! - [`transform`] - Normalization, mapping and the pipeline
//! - [`loader`] - Transactional batch loading
//! - [`store`] - Storage traits and PostgreSQL backend
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server and logging

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Storage
pub mod loader;
pub mod store;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::DatabaseSettings;

pub use error::{
    ConfigError, CsvError, LoadError, PipelineError, PipelineResult, StoreError,
};

pub use models::{LoadReport, QuoteDate, QuoteRecord};

pub use parser::{parse_str, RawRow, RecordReader};

pub use transform::{
    ingest, ingest_bytes, ingest_path, map_row, normalize_date, normalize_decimal,
    normalize_integer, parse_path, read_batch, IngestReport, ParsedBatch, QuoteMapper,
};

pub use loader::{shutdown_signal, Loader};

pub use store::{PgQuoteStore, QuoteStore, StoreSession};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
