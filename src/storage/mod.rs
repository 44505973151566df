use crate::error::StorageError;
use crate::models::{Invoice, InvoiceId};

mod gate;
mod sqlite;

pub use gate::{PersistenceGate, SaveOutcome};
pub use sqlite::SqliteStorage;

/// Durable invoice store.
///
/// Keys are compared by their digits alone, so `3125.0204` and `31250204`
/// name the same receipt. Implementations should reject a second record for
/// a key with [`StorageError::DuplicateKey`]; [`PersistenceGate`] relies on
/// that when two saves of the same receipt race.
pub trait InvoiceStore: Send + Sync {
    fn migrate(&self) -> Result<(), StorageError>;
    fn find_by_access_key(&self, access_key: &str) -> Result<Option<Invoice>, StorageError>;
    fn insert(&self, invoice: &Invoice) -> Result<InvoiceId, StorageError>;
}
