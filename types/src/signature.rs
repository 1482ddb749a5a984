//! Transaction signature identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The base58 signature that identifies a confirmed transaction.
///
/// Used as the dedup key for transfer consumption and carried on every
/// verified event for audit.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxSignature(String);

impl TxSignature {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TxSignature {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
