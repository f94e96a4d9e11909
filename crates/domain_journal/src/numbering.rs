//! Voucher numbering
//!
//! Voucher numbers are unique per company and date, formatted `YYYYMMDD-NNN`
//! with a zero-padded decimal sequence. The next sequence for a date is
//! derived as `max(existing) + 1` inside the same atomic unit that inserts
//! the voucher; there is no separate counter table to race against.

use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors parsing a persisted voucher number
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoucherNumberError {
    #[error("Malformed voucher number '{0}', expected YYYYMMDD-NNN")]
    Malformed(String),
}

/// A voucher number: posting date plus per-date sequence
///
/// Ordering is `(date, sequence)`, which matches the lexicographic order of
/// the persisted form for sequences up to 999 and stays correct beyond the
/// three-digit padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoucherNumber {
    date: NaiveDate,
    sequence: u32,
}

impl VoucherNumber {
    pub fn new(date: NaiveDate, sequence: u32) -> Self {
        Self { date, sequence }
    }

    /// The first number of a date
    pub fn first(date: NaiveDate) -> Self {
        Self::new(date, 1)
    }

    /// The number following the given highest existing sequence for a date.
    /// `None` means no voucher exists on that date yet.
    pub fn after(date: NaiveDate, max_existing: Option<u32>) -> Self {
        Self::new(date, max_existing.map_or(1, |s| s + 1))
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for VoucherNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:03}", self.date.format("%Y%m%d"), self.sequence)
    }
}

impl FromStr for VoucherNumber {
    type Err = VoucherNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || VoucherNumberError::Malformed(s.to_string());
        let (date_part, seq_part) = s.split_once('-').ok_or_else(malformed)?;
        // The date is fixed-width YYYYMMDD
        if date_part.len() != 8 || !date_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let year: i32 = date_part[..4].parse().map_err(|_| malformed())?;
        let month: u32 = date_part[4..6].parse().map_err(|_| malformed())?;
        let day: u32 = date_part[6..].parse().map_err(|_| malformed())?;
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(malformed)?;

        if seq_part.len() < 3 || !seq_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let sequence: u32 = seq_part.parse().map_err(|_| malformed())?;
        if sequence == 0 {
            return Err(malformed());
        }
        Ok(Self { date, sequence })
    }
}

impl Serialize for VoucherNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for VoucherNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_format_is_bit_exact() {
        let number = VoucherNumber::new(date(2024, 12, 31), 7);
        assert_eq!(number.to_string(), "20241231-007");
    }

    #[test]
    fn test_sequence_grows_past_padding() {
        let number = VoucherNumber::new(date(2024, 1, 5), 1024);
        assert_eq!(number.to_string(), "20240105-1024");
    }

    #[test]
    fn test_parse_round_trip() {
        let original = VoucherNumber::new(date(2024, 3, 1), 42);
        let parsed: VoucherNumber = original.to_string().parse().unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("20240301".parse::<VoucherNumber>().is_err());
        assert!("2024-03-01-001".parse::<VoucherNumber>().is_err());
        assert!("20240301-abc".parse::<VoucherNumber>().is_err());
        assert!("20240301-000".parse::<VoucherNumber>().is_err());
        assert!("20241301-001".parse::<VoucherNumber>().is_err());
    }

    #[test]
    fn test_after_derives_next_sequence() {
        let d = date(2024, 6, 15);
        assert_eq!(VoucherNumber::after(d, None), VoucherNumber::new(d, 1));
        assert_eq!(VoucherNumber::after(d, Some(3)), VoucherNumber::new(d, 4));
    }

    #[test]
    fn test_ordering_by_date_then_sequence() {
        let a = VoucherNumber::new(date(2024, 1, 2), 999);
        let b = VoucherNumber::new(date(2024, 1, 3), 1);
        let c = VoucherNumber::new(date(2024, 1, 3), 2);
        assert!(a < b && b < c);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn display_parse_round_trip(days in 0u32..20_000, seq in 1u32..5_000) {
            let date = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()
                + chrono::Duration::days(days as i64);
            let number = VoucherNumber::new(date, seq);
            let parsed: VoucherNumber = number.to_string().parse().unwrap();
            prop_assert_eq!(parsed, number);
        }
    }
}
