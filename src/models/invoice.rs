use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// NewType pattern for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvoiceId(pub i64);

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One purchased line of a receipt. Owned by exactly one [`Invoice`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInvoice {
    pub code: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit: String,
    /// Total value of the line, not the unit price.
    pub value: Decimal,
}

/// Invoice-level scalars recovered from the page header and footer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceHeader {
    pub market_name: Option<String>,
    pub invoice_date: Option<NaiveDateTime>,
    pub total_invoice: Option<Decimal>,
    pub quantity_total_items: Option<u32>,
    pub access_key: Option<String>,
}

impl InvoiceHeader {
    pub fn into_invoice(self, items: Vec<ItemInvoice>) -> Invoice {
        Invoice {
            id: None,
            market_name: self.market_name,
            invoice_date: self.invoice_date,
            total_invoice: self.total_invoice,
            quantity_total_items: self.quantity_total_items,
            access_key: self.access_key,
            items,
        }
    }
}

/// A scraped fiscal receipt. Header totals and `items` are read from
/// different page regions and are not reconciled against each other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<InvoiceId>,
    pub market_name: Option<String>,
    pub invoice_date: Option<NaiveDateTime>,
    pub total_invoice: Option<Decimal>,
    pub quantity_total_items: Option<u32>,
    pub access_key: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemInvoice>,
}

impl Invoice {
    pub fn is_empty(&self) -> bool {
        self.market_name.is_none()
            && self.invoice_date.is_none()
            && self.total_invoice.is_none()
            && self.quantity_total_items.is_none()
            && self.access_key.is_none()
            && self.items.is_empty()
    }

    /// True when nothing but the access key was recovered.
    pub fn has_only_access_key(&self) -> bool {
        self.access_key.is_some()
            && self.market_name.is_none()
            && self.invoice_date.is_none()
            && self.total_invoice.is_none()
            && self.quantity_total_items.is_none()
            && self.items.is_empty()
    }

    pub fn with_id(mut self, id: InvoiceId) -> Self {
        self.id = Some(id);
        self
    }
}
