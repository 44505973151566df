//! Request-level flow: validate the payload, extract, store once.

use std::sync::Arc;
use tracing::{error, info};

use crate::error::ServiceError;
use crate::models::{Invoice, QrPayload};
use crate::scrapers::ReceiptScraper;
use crate::storage::{PersistenceGate, SaveOutcome};

pub struct InvoiceService {
    scraper: Arc<dyn ReceiptScraper>,
    gate: Arc<PersistenceGate>,
}

impl InvoiceService {
    pub fn new(scraper: Arc<dyn ReceiptScraper>, gate: Arc<PersistenceGate>) -> Self {
        Self { scraper, gate }
    }

    /// Extract the receipt behind `raw_payload` and store it if it is new.
    ///
    /// Storage problems are logged, not returned: the caller still gets the
    /// extracted invoice, without an `id`.
    pub async fn process(&self, raw_payload: &str) -> Result<Invoice, ServiceError> {
        let payload = QrPayload::parse(raw_payload)?;
        let invoice = self.scraper.extract_invoice(&payload).await?;

        let gate = self.gate.clone();
        let candidate = invoice.clone();
        let saved = tokio::task::spawn_blocking(move || gate.save_if_absent(&candidate)).await;

        match saved {
            Ok(Ok(SaveOutcome::Inserted(id))) | Ok(Ok(SaveOutcome::AlreadyStored(id))) => {
                Ok(invoice.with_id(id))
            }
            Ok(Ok(SaveOutcome::MissingAccessKey)) | Ok(Ok(SaveOutcome::NothingRecognised)) => {
                info!("Returning unsaved invoice for payload {}", payload);
                Ok(invoice)
            }
            Ok(Err(e)) => {
                error!("Failed to store invoice: {}", e);
                Ok(invoice)
            }
            Err(e) => {
                error!("Storage task failed: {}", e);
                Ok(invoice)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PayloadError, StorageError, TransportError};
    use crate::models::InvoiceId;
    use crate::config::PortalConfig;
    use crate::scrapers::SefazMgScraper;
    use crate::storage::{InvoiceStore, SqliteStorage};
    use crate::utils::http::PageFetcher;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedScraper(Invoice);

    #[async_trait]
    impl ReceiptScraper for FixedScraper {
        async fn extract_invoice(&self, _payload: &QrPayload) -> Result<Invoice, TransportError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenStore;

    impl InvoiceStore for BrokenStore {
        fn migrate(&self) -> Result<(), StorageError> {
            Ok(())
        }

        fn find_by_access_key(&self, _access_key: &str) -> Result<Option<Invoice>, StorageError> {
            Err(StorageError::Poisoned)
        }

        fn insert(&self, _invoice: &Invoice) -> Result<InvoiceId, StorageError> {
            Err(StorageError::Poisoned)
        }
    }

    fn keyed() -> Invoice {
        Invoice {
            market_name: Some("SUPERMERCADO BH".to_string()),
            access_key: Some("3125".to_string()),
            ..Default::default()
        }
    }

    fn service(invoice: Invoice, store: Arc<dyn InvoiceStore>) -> InvoiceService {
        InvoiceService::new(
            Arc::new(FixedScraper(invoice)),
            Arc::new(PersistenceGate::new(store)),
        )
    }

    #[tokio::test]
    async fn blank_payload_is_rejected_before_fetching() {
        let service = service(keyed(), Arc::new(BrokenStore));
        let result = service.process("  ").await;
        assert!(matches!(result, Err(ServiceError::Payload(PayloadError::Empty))));
    }

    #[tokio::test]
    async fn repeated_requests_return_the_same_id() {
        let storage = SqliteStorage::in_memory().unwrap();
        storage.migrate().unwrap();
        let service = service(keyed(), Arc::new(storage.clone()));

        let first = service.process("3125|2|1").await.unwrap();
        let second = service.process("3125|2|1").await.unwrap();

        assert!(first.id.is_some());
        assert_eq!(first.id, second.id);
        assert_eq!(storage.count_invoices().unwrap(), 1);
    }

    #[tokio::test]
    async fn storage_failure_still_returns_invoice() {
        let service = service(keyed(), Arc::new(BrokenStore));

        let invoice = service.process("3125|2|1").await.unwrap();

        assert_eq!(invoice, keyed());
    }

    #[tokio::test]
    async fn keyless_invoice_is_returned_without_id() {
        let storage = SqliteStorage::in_memory().unwrap();
        storage.migrate().unwrap();
        let service = service(Invoice::default(), Arc::new(storage.clone()));

        let invoice = service.process("abc").await.unwrap();

        assert_eq!(invoice.id, None);
        assert_eq!(storage.count_invoices().unwrap(), 0);
    }

    /// Portal that answers with each page in turn, then repeats the last.
    struct PageSequence(Mutex<Vec<&'static str>>);

    #[async_trait]
    impl PageFetcher for PageSequence {
        async fn fetch_text(&self, _url: &str) -> Result<String, TransportError> {
            let mut pages = self.0.lock().unwrap();
            let page = if pages.len() > 1 { pages.remove(0) } else { pages[0] };
            Ok(page.to_string())
        }
    }

    #[tokio::test]
    async fn placeholder_page_does_not_shadow_the_real_receipt() {
        let storage = SqliteStorage::in_memory().unwrap();
        storage.migrate().unwrap();
        let fetcher = PageSequence(Mutex::new(vec![
            "<html><body>Sistema indispon\u{ed}vel</body></html>",
            include_str!("../tests/fixtures/receipt.html"),
        ]));
        let service = InvoiceService::new(
            Arc::new(SefazMgScraper::new(PortalConfig::default(), Arc::new(fetcher))),
            Arc::new(PersistenceGate::new(Arc::new(storage.clone()))),
        );
        let payload = "31250204641376021486650640001334691832214190|2|1|1|1308AB30";

        let unavailable = service.process(payload).await.unwrap();
        let real = service.process(payload).await.unwrap();
        let again = service.process(payload).await.unwrap();

        assert_eq!(unavailable.id, None);
        assert_eq!(
            unavailable.access_key.as_deref(),
            Some("31250204641376021486650640001334691832214190")
        );
        assert!(real.id.is_some());
        assert_eq!(real.items.len(), 3);
        assert_eq!(again.id, real.id);
        assert_eq!(storage.count_invoices().unwrap(), 1);
    }
}
