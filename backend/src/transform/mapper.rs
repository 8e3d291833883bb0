//! Binds raw CSV columns to [`QuoteRecord`] fields.
//!
//! Header names are fixed by the exchange export format and matched exactly
//! (after trimming). A missing column or an unparsable cell yields `None` for
//! that field; mapping a row never fails.

use rust_decimal::Decimal;

use super::normalize::{normalize_date, normalize_decimal, normalize_integer};
use crate::models::QuoteRecord;
use crate::parser::RawRow;

pub const COL_DATE: &str = "Date";
pub const COL_SERIES: &str = "series";
pub const COL_OPEN: &str = "OPEN";
pub const COL_HIGH: &str = "HIGH";
pub const COL_LOW: &str = "LOW";
pub const COL_PREV_CLOSE: &str = "PREV. CLOSE";
pub const COL_LTP: &str = "ltp";
pub const COL_CLOSE: &str = "close";
pub const COL_VWAP: &str = "vwap";
pub const COL_52W_HIGH: &str = "52W H";
pub const COL_52W_LOW: &str = "52W L";
pub const COL_VOLUME: &str = "VOLUME";
pub const COL_VALUE: &str = "VALUE";
pub const COL_TRADES: &str = "No of trades";

/// Expected header line, in export order.
pub const EXPECTED_COLUMNS: [&str; 14] = [
    COL_DATE,
    COL_SERIES,
    COL_OPEN,
    COL_HIGH,
    COL_LOW,
    COL_PREV_CLOSE,
    COL_LTP,
    COL_CLOSE,
    COL_VWAP,
    COL_52W_HIGH,
    COL_52W_LOW,
    COL_VOLUME,
    COL_VALUE,
    COL_TRADES,
];

/// Expected columns absent from `headers`.
pub fn missing_columns(headers: &[String]) -> Vec<&'static str> {
    EXPECTED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == col))
        .collect()
}

/// Maps rows and keeps a tally of cells that degraded to NULL.
#[derive(Debug, Default)]
pub struct QuoteMapper {
    malformed_cells: usize,
}

impl QuoteMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-empty cells seen so far that could not be normalized.
    pub fn malformed_cells(&self) -> usize {
        self.malformed_cells
    }

    pub fn map(&mut self, row: &RawRow) -> QuoteRecord {
        QuoteRecord {
            date: self.field(row, COL_DATE, normalize_date),
            series: row
                .get(COL_SERIES)
                .map(|s| s.trim_matches('"').trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            open: self.decimal(row, COL_OPEN),
            high: self.decimal(row, COL_HIGH),
            low: self.decimal(row, COL_LOW),
            prev_close: self.decimal(row, COL_PREV_CLOSE),
            ltp: self.decimal(row, COL_LTP),
            close: self.decimal(row, COL_CLOSE),
            vwap: self.decimal(row, COL_VWAP),
            week52_high: self.decimal(row, COL_52W_HIGH),
            week52_low: self.decimal(row, COL_52W_LOW),
            volume: self.field(row, COL_VOLUME, normalize_integer),
            value: self.decimal(row, COL_VALUE),
            no_of_trades: self.field(row, COL_TRADES, normalize_integer),
        }
    }

    fn decimal(&mut self, row: &RawRow, column: &str) -> Option<Decimal> {
        self.field(row, column, normalize_decimal)
    }

    fn field<T>(&mut self, row: &RawRow, column: &str, normalize: fn(&str) -> Option<T>) -> Option<T> {
        let raw = row.get(column)?;
        let value = normalize(raw);
        if value.is_none() && !is_blank(raw) {
            self.malformed_cells += 1;
        }
        value
    }
}

/// Map a single row without keeping statistics.
pub fn map_row(row: &RawRow) -> QuoteRecord {
    QuoteMapper::new().map(row)
}

fn is_blank(raw: &str) -> bool {
    raw.trim().trim_matches('"').trim().is_empty()
}
