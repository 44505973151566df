use serde::{Deserialize, Serialize};
use std::fmt;

use super::ACCESS_KEY_DIGITS;
use crate::error::PayloadError;

/// Raw `p` parameter of an NFC-e QR code, e.g.
/// `31250204641376021486650640001334691832214190|2|1|1|1308AB30...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QrPayload(String);

impl QrPayload {
    pub fn parse(raw: &str) -> Result<Self, PayloadError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PayloadError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First pipe-delimited token, if it looks like a 44-digit access key.
    pub fn access_key_token(&self) -> Option<&str> {
        let token = self.0.split('|').next()?.trim();
        let is_key = token.len() == ACCESS_KEY_DIGITS && token.bytes().all(|b| b.is_ascii_digit());
        is_key.then_some(token)
    }
}

impl fmt::Display for QrPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
