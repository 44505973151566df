use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::PortalConfig;
use crate::error::TransportError;

pub fn create_client(portal: &PortalConfig) -> Result<Client, TransportError> {
    let client = ClientBuilder::new()
        .user_agent(portal.user_agent.as_str())
        .timeout(Duration::from_secs(portal.timeout_seconds))
        .cookie_store(true)
        .pool_max_idle_per_host(6)
        .build()?;

    Ok(client)
}

/// Retrieves the raw text of a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, TransportError>;
}

/// [`PageFetcher`] over HTTP. One attempt per call; failures go to the caller.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(portal: &PortalConfig) -> Result<Self, TransportError> {
        Ok(Self::new(create_client(portal)?))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, TransportError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(e, url))?;

        let status = response.status();
        if !status.is_success() {
            warn!("HTTP error {}: {}", status, url);
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|e| classify(e, url))
    }
}

fn classify(e: reqwest::Error, url: &str) -> TransportError {
    if e.is_timeout() {
        warn!("Request timed out: {}", url);
        TransportError::Timeout { url: url.to_string() }
    } else {
        error!("Request failed for {}: {}", url, e);
        TransportError::Request(e)
    }
}
