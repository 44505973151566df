use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nfce_scraper::config::PortalConfig;
use nfce_scraper::utils::http::HttpFetcher;
use nfce_scraper::{
    InvoiceStore, PersistenceGate, QrPayload, ReceiptScraper, SaveOutcome, SefazMgScraper, SqliteStorage,
    TransportError,
};

const PAGE: &str = include_str!("fixtures/receipt.html");
const KEY: &str = "31250204641376021486650640001334691832214190";
const PORTAL_PATH: &str = "/portalnfce/sistema/qrcode.xhtml";

fn payload() -> QrPayload {
    QrPayload::parse(&format!("{KEY}|2|1|1|1308AB30650940E1EA488E7423E5898A8BF323BB")).unwrap()
}

fn scraper_for(server: &MockServer) -> SefazMgScraper {
    let portal = PortalConfig {
        url_template: format!("{}{}?p={{payload}}", server.uri(), PORTAL_PATH),
        timeout_seconds: 5,
        ..PortalConfig::default()
    };
    let fetcher = HttpFetcher::from_config(&portal).unwrap();
    SefazMgScraper::new(portal, Arc::new(fetcher))
}

#[tokio::test]
async fn well_formed_page_is_extracted_and_stored_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PORTAL_PATH))
        .and(query_param("p", payload().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let invoice = assert_ok!(scraper_for(&server).extract_invoice(&payload()).await);

    assert_eq!(
        invoice.market_name.as_deref(),
        Some("SUPERMERCADOS BH COMÉRCIO DE ALIMENTOS S/A")
    );
    assert!(invoice.invoice_date.is_some());
    assert_eq!(invoice.total_invoice, Some(Decimal::from_str("1048.42").unwrap()));
    assert_eq!(invoice.quantity_total_items, Some(3));
    assert!(invoice.access_key.is_some());
    assert_eq!(invoice.items.len(), 3);

    let storage = SqliteStorage::in_memory().unwrap();
    storage.migrate().unwrap();
    let gate = PersistenceGate::new(Arc::new(storage.clone()));

    let first = gate.save_if_absent(&invoice).unwrap();
    let second = gate.save_if_absent(&invoice).unwrap();

    assert!(matches!(first, SaveOutcome::Inserted(_)));
    assert!(matches!(second, SaveOutcome::AlreadyStored(_)));
    assert_eq!(storage.count_invoices().unwrap(), 1);

    let stored = storage
        .find_by_access_key(invoice.access_key.as_deref().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(stored.items, invoice.items);
}

#[tokio::test]
async fn portal_error_page_is_a_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Erro interno"))
        .expect(1)
        .mount(&server)
        .await;

    let result = scraper_for(&server).extract_invoice(&payload()).await;

    let err = assert_err!(result);
    assert!(matches!(err, TransportError::Status { status: 500, .. }));
}

#[tokio::test]
async fn unrecognised_page_is_a_sparse_invoice_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>NFC-e n\u{e3}o encontrada</body></html>"),
        )
        .mount(&server)
        .await;

    let invoice = assert_ok!(scraper_for(&server).extract_invoice(&payload()).await);

    assert_eq!(invoice.market_name, None);
    assert_eq!(invoice.total_invoice, None);
    assert!(invoice.items.is_empty());
    // Only the QR payload's key survives.
    assert_eq!(invoice.access_key.as_deref(), Some(KEY));
}
