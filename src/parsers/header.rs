//! Header field recovery.
//!
//! Each field has its own pattern, run independently against the raw page,
//! so an irregular region only costs the fields it holds.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::clean_text;
use super::number::{parse_decimal, parse_integer, NumberProfile};
use crate::error::FieldError;
use crate::models::InvoiceHeader;

const INVOICE_DATE_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

static MARKET_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<th[^>]*class="text-center text-uppercase"[^>]*>\s*<h4>\s*<b>(.*?)</b>"#)
        .expect("Invalid market name regex")
});

static INVOICE_DATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<td[^>]*>\s*(\d{2}/\d{2}/\d{4}\s+\d{2}:\d{2}:\d{2})\s*</td>")
        .expect("Invalid invoice date regex")
});

static TOTAL_INVOICE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<div[^>]*class="col-lg-2"[^>]*>\s*<strong>\s*(\d{1,3}(?:\.\d{3})*,\d{2})\s*</strong>"#)
        .expect("Invalid total invoice regex")
});

// Comma only as a thousands group, so a total like `48,42` never reads as a count.
static TOTAL_ITEMS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<div[^>]*class="col-lg-2"[^>]*>\s*<strong>\s*(\d{1,3}(?:,\d{3})+|\d+)\s*</strong>"#)
        .expect("Invalid total items regex")
});

// Either a digit run broken by - / . delimiters, or a bare 44-digit key.
static ACCESS_KEY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<td[^>]*>\s*(\d+(?:[-/.]\d+)+|\d{44})\s*</td>")
        .expect("Invalid access key regex")
});

enum Setter {
    Text(fn(&mut InvoiceHeader, String)),
    Timestamp(fn(&mut InvoiceHeader, NaiveDateTime)),
    Decimal(NumberProfile, fn(&mut InvoiceHeader, Decimal)),
    Count(NumberProfile, fn(&mut InvoiceHeader, u32)),
}

struct HeaderRule {
    field: &'static str,
    pattern: &'static Lazy<Regex>,
    setter: Setter,
}

// The count is a whole number rendered with comma thousands. Item quantities
// are weighed amounts with a decimal comma and use the Brazilian profile
// instead (see `items`).
static HEADER_RULES: [HeaderRule; 5] = [
    HeaderRule {
        field: "market_name",
        pattern: &MARKET_NAME_REGEX,
        setter: Setter::Text(|h, v| h.market_name = Some(v)),
    },
    HeaderRule {
        field: "invoice_date",
        pattern: &INVOICE_DATE_REGEX,
        setter: Setter::Timestamp(|h, v| h.invoice_date = Some(v)),
    },
    HeaderRule {
        field: "total_invoice",
        pattern: &TOTAL_INVOICE_REGEX,
        setter: Setter::Decimal(NumberProfile::BRAZILIAN, |h, v| h.total_invoice = Some(v)),
    },
    HeaderRule {
        field: "quantity_total_items",
        pattern: &TOTAL_ITEMS_REGEX,
        setter: Setter::Count(NumberProfile::PLAIN_THOUSANDS, |h, v| {
            h.quantity_total_items = Some(v)
        }),
    },
    HeaderRule {
        field: "access_key",
        pattern: &ACCESS_KEY_REGEX,
        setter: Setter::Text(|h, v| h.access_key = Some(v)),
    },
];

impl HeaderRule {
    fn capture<'p>(&self, page: &'p str) -> Result<&'p str, FieldError> {
        self.pattern
            .captures(page)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or(FieldError::PatternNotFound { field: self.field })
    }

    fn apply(&self, page: &str, header: &mut InvoiceHeader) -> Result<(), FieldError> {
        let raw = clean_text(self.capture(page)?);
        if raw.is_empty() {
            return Err(FieldError::PatternNotFound { field: self.field });
        }

        match &self.setter {
            Setter::Text(set) => set(header, raw),
            Setter::Timestamp(set) => set(header, parse_timestamp(&raw)?),
            Setter::Decimal(profile, set) => set(header, parse_decimal(&raw, *profile)?),
            Setter::Count(profile, set) => set(header, parse_integer(&raw, *profile)?),
        }
        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, FieldError> {
    NaiveDateTime::parse_from_str(raw, INVOICE_DATE_FORMAT)
        .map_err(|_| FieldError::MalformedTimestamp { raw: raw.to_string() })
}

/// Recover the five header fields from a receipt page.
///
/// Best-effort per field: a missing or malformed field is left `None`.
pub fn extract_header(page: &str) -> InvoiceHeader {
    let mut header = InvoiceHeader::default();

    for rule in HEADER_RULES.iter() {
        match rule.apply(page, &mut header) {
            Ok(()) => {}
            Err(e @ FieldError::PatternNotFound { .. }) => debug!("Header field absent: {}", e),
            Err(e) => warn!("Discarding header field {}: {}", rule.field, e),
        }
    }

    header
}
