use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nfce_scraper::api;
use nfce_scraper::utils::http::HttpFetcher;
use nfce_scraper::{Config, InvoiceService, InvoiceStore, PersistenceGate, SefazMgScraper, SqliteStorage};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter = EnvFilter::from_default_env().add_directive("nfce_scraper=info".parse()?);
    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting NFC-e scraper");

    // Initialize storage
    let storage = Arc::new(
        SqliteStorage::new(&config.database.path)
            .with_context(|| format!("Failed to open SQLite database {}", config.database.path))?,
    );
    storage.migrate().context("Failed to migrate database")?;

    // Initialize HTTP client and scraper
    let fetcher = Arc::new(HttpFetcher::from_config(&config.portal).context("Failed to build HTTP client")?);
    let scraper = Arc::new(SefazMgScraper::new(config.portal.clone(), fetcher));
    let gate = Arc::new(PersistenceGate::new(storage));
    let service = Arc::new(InvoiceService::new(scraper, gate));

    let app = api::router(service);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);
    info!("  GET /?qr_code_parameter=<payload>  - extract and store a receipt");
    info!("  GET /health");

    axum::serve(listener, app).await?;

    Ok(())
}
