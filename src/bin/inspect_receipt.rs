//! Print the invoice extracted from a receipt page without storing it.
//!
//!     inspect_receipt saved_page.html
//!     inspect_receipt '31250204641376021486650640001334691832214190|2|1|1|1308AB30...'

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use nfce_scraper::scrapers::invoice_from_page;
use nfce_scraper::utils::http::HttpFetcher;
use nfce_scraper::{assemble, Config, QrPayload, SefazMgScraper};

const SAMPLE_FILE: &str = "receipt_sample.html";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let arg = std::env::args()
        .nth(1)
        .context("usage: inspect_receipt <saved page | QR payload>")?;

    let invoice = if Path::new(&arg).is_file() {
        let page = fs::read_to_string(&arg).with_context(|| format!("Failed to read {}", arg))?;
        assemble(&page)
    } else {
        let config = Config::load()?;
        let payload = QrPayload::parse(&arg)?;
        let fetcher = HttpFetcher::from_config(&config.portal)?;
        let scraper = SefazMgScraper::new(config.portal.clone(), Arc::new(fetcher));

        let page = scraper.fetch_page(&payload).await?;
        fs::write(SAMPLE_FILE, &page).with_context(|| format!("Failed to write {}", SAMPLE_FILE))?;
        eprintln!("Saved page to {}", SAMPLE_FILE);

        invoice_from_page(&page, &payload)
    };

    println!("{}", serde_json::to_string_pretty(&invoice)?);
    eprintln!(
        "{} items, header total {:?}, header item count {:?}",
        invoice.items.len(),
        invoice.total_invoice,
        invoice.quantity_total_items
    );

    Ok(())
}
