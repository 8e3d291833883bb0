//! Transformation module.
//!
//! - Normalize: cell text to typed values
//! - Mapper: raw rows to quote records
//! - Pipeline: parse, map and load in one call

pub mod mapper;
pub mod normalize;
pub mod pipeline;

pub use mapper::{map_row, missing_columns, QuoteMapper, EXPECTED_COLUMNS};
pub use normalize::{normalize_date, normalize_decimal, normalize_integer};
pub use pipeline::*;
