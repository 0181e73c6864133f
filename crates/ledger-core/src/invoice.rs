//! # Invoice Numbering
//!
//! Deterministic, human-readable numbers for sales and orders.
//!
//! Invoice numbers are a zero-padded sequence scoped to a calendar day:
//! `INV-20260825-0007` is the seventh sale created on 2026-08-25. The
//! sequence number is the count of that day's existing rows plus one,
//! taken inside the creating transaction, so collisions are impossible
//! even under concurrent creation.

use chrono::NaiveDate;

/// Formats a daily sale invoice number.
pub fn format_invoice_number(date: NaiveDate, seq: i64) -> String {
    format!("INV-{}-{:04}", date.format("%Y%m%d"), seq)
}

/// Formats a daily online order number.
pub fn format_order_number(date: NaiveDate, seq: i64) -> String {
    format!("ORD-{}-{:04}", date.format("%Y%m%d"), seq)
}

/// The LIKE pattern matching every invoice number of one day. Used by
/// the in-transaction count that derives the next sequence number.
pub fn invoice_day_pattern(date: NaiveDate) -> String {
    format!("INV-{}-%", date.format("%Y%m%d"))
}

/// The LIKE pattern matching every order number of one day.
pub fn order_day_pattern(date: NaiveDate) -> String {
    format!("ORD-{}-%", date.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 25).unwrap()
    }

    #[test]
    fn test_invoice_number_format() {
        assert_eq!(format_invoice_number(day(), 1), "INV-20260825-0001");
        assert_eq!(format_invoice_number(day(), 42), "INV-20260825-0042");
        assert_eq!(format_invoice_number(day(), 12345), "INV-20260825-12345");
    }

    #[test]
    fn test_order_number_format() {
        assert_eq!(format_order_number(day(), 7), "ORD-20260825-0007");
    }

    #[test]
    fn test_day_patterns_match_generated_numbers() {
        let n = format_invoice_number(day(), 3);
        let pattern = invoice_day_pattern(day());
        let prefix = pattern.trim_end_matches('%');
        assert!(n.starts_with(prefix));
    }

    #[test]
    fn test_numbers_are_monotonic_within_a_day() {
        let a = format_invoice_number(day(), 8);
        let b = format_invoice_number(day(), 9);
        assert!(b > a);
    }
}
