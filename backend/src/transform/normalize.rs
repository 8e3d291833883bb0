//! Cell normalization.
//!
//! Total functions from raw cell text to typed values. Anything that does not
//! parse yields `None`; nothing here returns an error.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::models::QuoteDate;

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Remove quotes and thousands separators, then trim.
fn clean_numeric(text: &str) -> String {
    text.chars()
        .filter(|c| *c != '"' && *c != ',')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Normalize a `DAY-MONTH-YEAR` cell (e.g. `05-Jan-2024`) into a [`QuoteDate`].
///
/// Month may be numeric or an English month name / abbreviation. Returns
/// `None` when one of the three parts is missing.
pub fn normalize_date(text: &str) -> Option<QuoteDate> {
    let cleaned = text.trim().trim_matches('"').trim();
    let mut parts = cleaned.split('-').map(str::trim);

    let day = parts.next().filter(|p| !p.is_empty())?;
    let month = parts.next().filter(|p| !p.is_empty())?;
    let year = parts.next().filter(|p| !p.is_empty())?;

    Some(QuoteDate::from_parts(year, &normalize_month(month), &pad_numeric(day)))
}

fn normalize_month(month: &str) -> String {
    if month.chars().all(|c| c.is_ascii_alphabetic()) && month.len() >= 3 {
        let prefix = month[..3].to_ascii_lowercase();
        if let Some(idx) = MONTHS.iter().position(|m| *m == prefix) {
            return format!("{:02}", idx + 1);
        }
        return month.to_string();
    }
    pad_numeric(month)
}

fn pad_numeric(part: &str) -> String {
    if part.len() == 1 && part.chars().all(|c| c.is_ascii_digit()) {
        format!("0{}", part)
    } else {
        part.to_string()
    }
}

/// Normalize a decimal cell such as `"1,234.50"`, keeping its scale.
///
/// [`Decimal`] holds at most 28 significant digits. A well-formed value wider
/// than that, such as a 30-digit integer, yields `None` and is stored as NULL
/// even though the `NUMERIC` column could hold it.
pub fn normalize_decimal(text: &str) -> Option<Decimal> {
    let cleaned = clean_numeric(text);
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// Normalize an integer cell. Fractional input is truncated toward zero.
pub fn normalize_integer(text: &str) -> Option<i64> {
    let cleaned = clean_numeric(text);
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(n) = cleaned.parse::<i64>() {
        return Some(n);
    }
    Decimal::from_str(&cleaned).ok()?.trunc().to_i64()
}
