//! Error types shared across extraction, transport and storage.

use thiserror::Error;

/// A single header field or item cell could not be recovered.
///
/// Never aborts an extraction: the field is left absent or the row dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("malformed number: {raw:?}")]
    MalformedNumber { raw: String },

    #[error("malformed timestamp: {raw:?}")]
    MalformedTimestamp { raw: String },

    #[error("pattern not found for {field}")]
    PatternNotFound { field: &'static str },
}

/// The receipt page could not be retrieved.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("invalid portal URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("HTTP error {status} from {url}")]
    Status { status: u16, url: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("access key {0} is already stored")]
    DuplicateKey(String),

    #[error("storage lock poisoned")]
    Poisoned,

    #[error("corrupt stored value in {column}: {value:?}")]
    Corrupt { column: &'static str, value: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("QR code parameter is required")]
    Empty,
}

/// Failure of a whole extract-and-store request.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
