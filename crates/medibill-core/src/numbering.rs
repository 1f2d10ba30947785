//! # Invoice Numbering
//!
//! Invoice numbers look like `INV-2610-0042`:
//!
//! ```text
//!   INV   -  26  10  -  0042
//!   ───      ──  ──     ────
//!   prefix   YY  MM     sequence within (tenant, prefix, YYMM), from 1
//! ```
//!
//! This module only formats and parses. The sequence itself comes from an
//! atomic counter in the database layer.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::validation::validate_invoice_prefix;

/// The `YYMM` period an invoice number belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InvoicePeriod {
    year: i32,
    month: u32,
}

impl InvoicePeriod {
    pub fn from_date(date: DateTime<Utc>) -> Self {
        InvoicePeriod {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Counter key used in storage (`2610`).
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for InvoicePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{:02}", self.year.rem_euclid(100), self.month)
    }
}

/// Formats `{prefix}-{YY}{MM}-{seq:04}`. Sequences past 9999 simply widen.
pub fn format_invoice_number(prefix: &str, period: InvoicePeriod, seq: u32) -> String {
    format!("{}-{}-{:04}", prefix, period, seq)
}

/// A parsed invoice number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInvoiceNumber {
    pub prefix: String,
    pub yymm: String,
    pub sequence: u32,
}

/// Splits an invoice number back into prefix, period and sequence.
///
/// Prefixes may themselves contain `-`, so the split is taken from the right.
pub fn parse_invoice_number(number: &str) -> CoreResult<ParsedInvoiceNumber> {
    let malformed = || CoreError::MalformedInvoiceNumber(number.to_string());

    let (rest, seq) = number.rsplit_once('-').ok_or_else(malformed)?;
    let (prefix, yymm) = rest.rsplit_once('-').ok_or_else(malformed)?;

    if yymm.len() != 4 || !yymm.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }
    let month: u32 = yymm[2..].parse().map_err(|_| malformed())?;
    if !(1..=12).contains(&month) {
        return Err(malformed());
    }
    if seq.len() < 4 || !seq.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }
    let sequence: u32 = seq.parse().map_err(|_| malformed())?;
    if sequence == 0 {
        return Err(malformed());
    }
    validate_invoice_prefix(prefix).map_err(|_| malformed())?;

    Ok(ParsedInvoiceNumber {
        prefix: prefix.to_string(),
        yymm: yymm.to_string(),
        sequence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_period_from_date() {
        let date = Utc.with_ymd_and_hms(2026, 3, 9, 23, 59, 59).unwrap();
        let period = InvoicePeriod::from_date(date);
        assert_eq!(period.key(), "2603");
        assert_eq!(period.month(), 3);
    }

    #[test]
    fn test_format() {
        let period = InvoicePeriod::from_date(Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap());
        assert_eq!(format_invoice_number("INV", period, 1), "INV-2610-0001");
        assert_eq!(format_invoice_number("CITY-H", period, 42), "CITY-H-2610-0042");
        assert_eq!(format_invoice_number("INV", period, 12345), "INV-2610-12345");
    }

    #[test]
    fn test_parse() {
        let parsed = parse_invoice_number("CITY-H-2610-0042").unwrap();
        assert_eq!(parsed.prefix, "CITY-H");
        assert_eq!(parsed.yymm, "2610");
        assert_eq!(parsed.sequence, 42);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "INV", "INV-2610", "INV-2613-0001", "INV-2610-01", "INV-2610-0000", "inv-2610-0001", "INV-26A0-0001"] {
            assert!(parse_invoice_number(bad).is_err(), "{} should be rejected", bad);
        }
    }
}
