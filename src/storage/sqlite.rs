use chrono::NaiveDateTime;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

use crate::error::StorageError;
use crate::models::{access_key_digits, Invoice, InvoiceId, ItemInvoice};
use crate::storage::InvoiceStore;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    pub fn new(db_path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;
        Ok(Self::from_connection(conn))
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    pub fn count_invoices(&self) -> Result<usize, StorageError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM invoices", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl InvoiceStore for SqliteStorage {
    fn migrate(&self) -> Result<(), StorageError> {
        let conn = self.lock()?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS invoices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                access_key TEXT,
                access_key_digits TEXT,
                market_name TEXT,
                invoice_date TEXT,
                total_invoice TEXT,
                quantity_total_items INTEGER,
                stored_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_invoices_access_key_digits
                ON invoices(access_key_digits);

            CREATE TABLE IF NOT EXISTS invoice_items (
                invoice_id INTEGER NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                code TEXT NOT NULL,
                description TEXT NOT NULL,
                quantity TEXT NOT NULL,
                unit TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (invoice_id, position)
            );",
        )?;

        info!("Database migration completed");
        Ok(())
    }

    fn find_by_access_key(&self, access_key: &str) -> Result<Option<Invoice>, StorageError> {
        let conn = self.lock()?;

        let stored = conn
            .query_row(
                "SELECT id, market_name, invoice_date, total_invoice, quantity_total_items, access_key
                 FROM invoices WHERE access_key_digits = ?1",
                params![access_key_digits(access_key)],
                StoredInvoice::from_row,
            )
            .optional()?;

        let Some(stored) = stored else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT code, description, quantity, unit, value
             FROM invoice_items WHERE invoice_id = ?1 ORDER BY position",
        )?;
        let items = stmt
            .query_map(params![stored.id], StoredItem::from_row)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(StoredItem::into_item)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(stored.into_invoice(items)?))
    }

    fn insert(&self, invoice: &Invoice) -> Result<InvoiceId, StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT INTO invoices (access_key, access_key_digits, market_name, invoice_date, total_invoice, quantity_total_items)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                invoice.access_key,
                invoice.access_key.as_deref().map(access_key_digits),
                invoice.market_name,
                invoice.invoice_date.map(|d| d.format(TIMESTAMP_FORMAT).to_string()),
                invoice.total_invoice.map(|t| t.to_string()),
                invoice.quantity_total_items,
            ],
        );

        if let Err(rusqlite::Error::SqliteFailure(e, _)) = &inserted {
            if e.code == ErrorCode::ConstraintViolation {
                return Err(StorageError::DuplicateKey(
                    invoice.access_key.clone().unwrap_or_default(),
                ));
            }
        }
        inserted?;

        let id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO invoice_items (invoice_id, position, code, description, quantity, unit, value)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (position, item) in invoice.items.iter().enumerate() {
                stmt.execute(params![
                    id,
                    position as i64,
                    item.code,
                    item.description,
                    item.quantity.to_string(),
                    item.unit,
                    item.value.to_string(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(InvoiceId(id))
    }
}

struct StoredInvoice {
    id: i64,
    market_name: Option<String>,
    invoice_date: Option<String>,
    total_invoice: Option<String>,
    quantity_total_items: Option<u32>,
    access_key: Option<String>,
}

impl StoredInvoice {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            market_name: row.get(1)?,
            invoice_date: row.get(2)?,
            total_invoice: row.get(3)?,
            quantity_total_items: row.get(4)?,
            access_key: row.get(5)?,
        })
    }

    fn into_invoice(self, items: Vec<ItemInvoice>) -> Result<Invoice, StorageError> {
        let invoice_date = self
            .invoice_date
            .map(|raw| {
                NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
                    .map_err(|_| StorageError::Corrupt { column: "invoice_date", value: raw })
            })
            .transpose()?;

        Ok(Invoice {
            id: Some(InvoiceId(self.id)),
            market_name: self.market_name,
            invoice_date,
            total_invoice: self
                .total_invoice
                .map(|raw| decimal_column("total_invoice", raw))
                .transpose()?,
            quantity_total_items: self.quantity_total_items,
            access_key: self.access_key,
            items,
        })
    }
}

struct StoredItem {
    code: String,
    description: String,
    quantity: String,
    unit: String,
    value: String,
}

impl StoredItem {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            code: row.get(0)?,
            description: row.get(1)?,
            quantity: row.get(2)?,
            unit: row.get(3)?,
            value: row.get(4)?,
        })
    }

    fn into_item(self) -> Result<ItemInvoice, StorageError> {
        Ok(ItemInvoice {
            code: self.code,
            description: self.description,
            quantity: decimal_column("quantity", self.quantity)?,
            unit: self.unit,
            value: decimal_column("value", self.value)?,
        })
    }
}

fn decimal_column(column: &'static str, raw: String) -> Result<Decimal, StorageError> {
    Decimal::from_str(&raw).map_err(|_| StorageError::Corrupt { column, value: raw })
}
