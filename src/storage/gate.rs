use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::models::{Invoice, InvoiceId};
use crate::storage::InvoiceStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted(InvoiceId),
    /// A record with the same access key exists; nothing was written.
    AlreadyStored(InvoiceId),
    MissingAccessKey,
    /// Only the key is known, as when the portal served a placeholder page.
    /// Storing it would shadow the real receipt under first-write-wins.
    NothingRecognised,
}

/// First-write-wins persistence keyed by access key.
///
/// The lookup only avoids needless writes. Two concurrent saves can both
/// miss it; the store's unique index then rejects the loser, which is
/// reported as [`SaveOutcome::AlreadyStored`].
pub struct PersistenceGate {
    store: Arc<dyn InvoiceStore>,
}

impl PersistenceGate {
    pub fn new(store: Arc<dyn InvoiceStore>) -> Self {
        Self { store }
    }

    pub fn save_if_absent(&self, invoice: &Invoice) -> Result<SaveOutcome, StorageError> {
        let Some(access_key) = invoice.access_key.as_deref() else {
            warn!("Invoice has no access key, not storing it");
            return Ok(SaveOutcome::MissingAccessKey);
        };

        if invoice.has_only_access_key() {
            warn!("Nothing but the access key {} was recognised, not storing it", access_key);
            return Ok(SaveOutcome::NothingRecognised);
        }

        debug!("Checking for stored invoice {}", access_key);
        if let Some(existing) = self.store.find_by_access_key(access_key)? {
            info!("Invoice {} already stored, nothing to do", access_key);
            return Ok(SaveOutcome::AlreadyStored(existing_id(&existing)?));
        }

        match self.store.insert(invoice) {
            Ok(id) => {
                info!("Stored invoice {} with id {} ({} items)", access_key, id, invoice.items.len());
                Ok(SaveOutcome::Inserted(id))
            }
            Err(StorageError::DuplicateKey(_)) => {
                info!("Invoice {} was stored by a concurrent request", access_key);
                let existing = self
                    .store
                    .find_by_access_key(access_key)?
                    .ok_or_else(|| StorageError::DuplicateKey(access_key.to_string()))?;
                Ok(SaveOutcome::AlreadyStored(existing_id(&existing)?))
            }
            Err(e) => Err(e),
        }
    }
}

fn existing_id(invoice: &Invoice) -> Result<InvoiceId, StorageError> {
    invoice.id.ok_or(StorageError::Corrupt {
        column: "id",
        value: String::new(),
    })
}
