//! Base58 wallet address type.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ValidationError;

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// A base58-encoded account address.
///
/// Addresses read back from the chain are trusted as-is via [`WalletAddress::new`];
/// addresses typed in by a user go through [`WalletAddress::parse`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Shortest valid encoding of a 32-byte public key.
    pub const MIN_LEN: usize = 32;
    /// Longest valid encoding of a 32-byte public key.
    pub const MAX_LEN: usize = 44;

    /// Wrap a raw address string without validation.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Validate a user-supplied address.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ValidationError::MissingField("walletAddress"));
        }
        if !(Self::MIN_LEN..=Self::MAX_LEN).contains(&raw.len()) {
            return Err(ValidationError::InvalidField {
                field: "walletAddress",
                reason: format!(
                    "must be {}-{} characters, got {}",
                    Self::MIN_LEN,
                    Self::MAX_LEN,
                    raw.len()
                ),
            });
        }
        if let Some(bad) = raw.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
            return Err(ValidationError::InvalidField {
                field: "walletAddress",
                reason: format!("{bad:?} is not a base58 character"),
            });
        }
        Ok(Self(raw.to_string()))
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for WalletAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for WalletAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
