//! Domain models for the Quoteload ingestion pipeline.
//!
//! - [`QuoteDate`] - trading date reassembled as `YYYY-MM-DD` text
//! - [`QuoteRecord`] - one normalized, storage-ready quote row
//! - [`LoadReport`] - outcome of a committed load

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Quote Date
// =============================================================================

/// Trading date in storage order (`YEAR-MONTH-DAY`).
///
/// Not checked against the calendar: `31-Feb-2024` becomes `2024-02-31` and is
/// left for the database to accept or reject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteDate(String);

impl QuoteDate {
    /// Assemble from already-cleaned parts.
    pub fn from_parts(year: &str, month: &str, day: &str) -> Self {
        Self(format!("{}-{}-{}", year, month, day))
    }

    /// Storage text, e.g. `2024-01-05`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Calendar date, when the text happens to be a valid one.
    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.0, "%Y-%m-%d").ok()
    }
}

impl fmt::Display for QuoteDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Quote Record
// =============================================================================

/// A normalized quote row.
///
/// Every field is optional: a cell that cannot be normalized is stored as
/// NULL instead of rejecting the row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub date: Option<QuoteDate>,
    pub series: Option<String>,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub prev_close: Option<Decimal>,
    pub ltp: Option<Decimal>,
    pub close: Option<Decimal>,
    pub vwap: Option<Decimal>,
    pub week52_high: Option<Decimal>,
    pub week52_low: Option<Decimal>,
    pub volume: Option<i64>,
    pub value: Option<Decimal>,
    pub no_of_trades: Option<i64>,
}

// =============================================================================
// Load Report
// =============================================================================

/// Result of a successful, committed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Rows committed in this transaction.
    pub committed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_date_roundtrips_to_calendar() {
        let date = QuoteDate::from_parts("2024", "01", "05");
        assert_eq!(date.as_str(), "2024-01-05");
        assert_eq!(date.to_naive_date(), NaiveDate::from_ymd_opt(2024, 1, 5));
    }

    #[test]
    fn test_quote_date_keeps_impossible_day() {
        let date = QuoteDate::from_parts("2024", "02", "31");
        assert_eq!(date.to_string(), "2024-02-31");
        assert!(date.to_naive_date().is_none());
    }

    #[test]
    fn test_record_serializes_nulls() {
        let json = serde_json::to_value(QuoteRecord::default()).unwrap();
        assert!(json["open"].is_null());
        assert!(json["date"].is_null());
    }
}
