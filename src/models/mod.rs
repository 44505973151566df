pub mod invoice;
pub mod payload;

pub use invoice::*;
pub use payload::*;

/// Number of digits in an NFC-e access key.
pub const ACCESS_KEY_DIGITS: usize = 44;

/// Digits of an access key, dropping the `.`, `-` or `/` grouping the portal
/// renders. Two spellings of one receipt's key share this form.
pub fn access_key_digits(access_key: &str) -> String {
    access_key.chars().filter(char::is_ascii_digit).collect()
}
