use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::config::{PortalConfig, PAYLOAD_PLACEHOLDER};
use crate::error::TransportError;
use crate::models::{access_key_digits, Invoice, QrPayload};
use crate::parsers::{extract_header, extract_items};
use crate::scrapers::ReceiptScraper;
use crate::utils::http::PageFetcher;

// Characters that would break out of the `p` query value. `|` stays literal.
const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'>');

/// Scraper for the SEFAZ-MG NFC-e consultation portal.
pub struct SefazMgScraper {
    portal: PortalConfig,
    fetcher: Arc<dyn PageFetcher>,
}

impl SefazMgScraper {
    pub fn new(portal: PortalConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { portal, fetcher }
    }

    pub fn build_url(&self, payload: &QrPayload) -> Result<Url, TransportError> {
        let encoded = utf8_percent_encode(payload.as_str(), QUERY_VALUE).to_string();
        let raw = self.portal.url_template.replace(PAYLOAD_PLACEHOLDER, &encoded);
        Url::parse(&raw).map_err(|source| TransportError::InvalidUrl { url: raw, source })
    }

    pub async fn fetch_page(&self, payload: &QrPayload) -> Result<String, TransportError> {
        let url = self.build_url(payload)?;
        info!("Fetching receipt page: {}", url);
        self.fetcher.fetch_text(url.as_str()).await
    }
}

#[async_trait]
impl ReceiptScraper for SefazMgScraper {
    async fn extract_invoice(&self, payload: &QrPayload) -> Result<Invoice, TransportError> {
        let page = self.fetch_page(payload).await?;
        Ok(invoice_from_page(&page, payload))
    }
}

/// [`assemble`], with the payload's access key as fallback.
pub fn invoice_from_page(page: &str, payload: &QrPayload) -> Invoice {
    let mut invoice = assemble(page);
    reconcile_access_key(&mut invoice, payload);
    invoice
}

/// Build an [`Invoice`] from page text alone.
pub fn assemble(page: &str) -> Invoice {
    let invoice = extract_header(page).into_invoice(extract_items(page));

    if invoice.is_empty() {
        warn!("Nothing recognisable on receipt page ({} bytes)", page.len());
    } else {
        info!(
            "Extracted invoice {} from {}: {} items",
            invoice.access_key.as_deref().unwrap_or("<no key>"),
            invoice.market_name.as_deref().unwrap_or("<unknown market>"),
            invoice.items.len()
        );
    }

    invoice
}

/// The page is the source of truth; the payload's key only fills a gap.
fn reconcile_access_key(invoice: &mut Invoice, payload: &QrPayload) {
    let Some(token) = payload.access_key_token() else {
        return;
    };

    match invoice.access_key.as_deref() {
        None => {
            warn!("No access key on page, using QR payload key {}", token);
            invoice.access_key = Some(token.to_string());
        }
        Some(found) => {
            if access_key_digits(found) != token {
                warn!("Page access key {} differs from QR payload key {}", found, token);
            }
        }
    }
}
