//! Locale-aware numeric normalization.
//!
//! SEFAZ pages render numbers in more than one format, so every caller
//! names the [`NumberProfile`] matching the field it reads.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::FieldError;

static CANONICAL_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+(?:\.\d+)?$").expect("Invalid canonical number regex")
});

/// A (thousands separator, decimal separator) pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberProfile {
    pub thousands: Option<char>,
    pub decimal: char,
}

impl NumberProfile {
    /// `1.234,56`: dotted thousands, comma decimal.
    pub const BRAZILIAN: Self = Self::new(Some('.'), ',');
    /// `1,500`: comma thousands, no grouping inside the fraction.
    pub const PLAIN_THOUSANDS: Self = Self::new(Some(','), '.');
    /// `1234.56`: already canonical.
    pub const CANONICAL: Self = Self::new(None, '.');

    pub const fn new(thousands: Option<char>, decimal: char) -> Self {
        Self { thousands, decimal }
    }
}

/// Strip the thousands separator and map the decimal separator to `.`.
pub fn normalize(raw: &str, profile: NumberProfile) -> String {
    raw.trim()
        .chars()
        .filter(|c| Some(*c) != profile.thousands)
        .map(|c| if c == profile.decimal { '.' } else { c })
        .collect()
}

/// Parse a non-negative, locale-formatted decimal.
pub fn parse_decimal(raw: &str, profile: NumberProfile) -> Result<Decimal, FieldError> {
    let normalized = normalize(raw, profile);
    if !CANONICAL_NUMBER.is_match(&normalized) {
        return Err(FieldError::MalformedNumber { raw: raw.to_string() });
    }
    Decimal::from_str(&normalized).map_err(|_| FieldError::MalformedNumber { raw: raw.to_string() })
}

/// Parse a non-negative, locale-formatted integer count.
pub fn parse_integer(raw: &str, profile: NumberProfile) -> Result<u32, FieldError> {
    let normalized = normalize(raw, profile);
    if normalized.is_empty() || !normalized.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FieldError::MalformedNumber { raw: raw.to_string() });
    }
    normalized
        .parse()
        .map_err(|_| FieldError::MalformedNumber { raw: raw.to_string() })
}
