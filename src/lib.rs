//! Scraper for Brazilian NFC-e fiscal receipts.
//!
//! A QR-code payload is turned into the SEFAZ consultation URL, the page is
//! fetched, header fields and line items are recovered from its markup, and
//! the resulting [`models::Invoice`] is stored once per access key.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod parsers;
pub mod scrapers;
pub mod service;
pub mod storage;
pub mod utils;

pub use crate::config::Config;
pub use error::{FieldError, PayloadError, ServiceError, StorageError, TransportError};
pub use models::{Invoice, InvoiceId, ItemInvoice, QrPayload};
pub use scrapers::{assemble, ReceiptScraper, SefazMgScraper};
pub use service::InvoiceService;
pub use storage::{InvoiceStore, PersistenceGate, SaveOutcome, SqliteStorage};
