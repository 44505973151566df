use async_trait::async_trait;

use crate::error::TransportError;
use crate::models::{Invoice, QrPayload};

mod sefaz_mg;

pub use sefaz_mg::{assemble, invoice_from_page, SefazMgScraper};

#[async_trait]
pub trait ReceiptScraper: Send + Sync {
    /// Fetch the receipt page for `payload` and extract its invoice.
    ///
    /// Only transport failures are errors; an unrecognisable page yields a
    /// sparse or empty [`Invoice`].
    async fn extract_invoice(&self, payload: &QrPayload) -> Result<Invoice, TransportError>;
}
