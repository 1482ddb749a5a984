//! Verified record storage trait.

use crate::StoreError;
use dustproof_types::{IntentId, VerifiedRecord};

/// Append-only log of confirmed identity/wallet bindings.
pub trait VerifiedStore: Send + Sync {
    /// Append records whose id is not yet present; records with an id that is
    /// already verified are skipped. Returns the number appended.
    fn append(&self, records: &[VerifiedRecord]) -> Result<usize, StoreError>;

    /// Whether a record with this intent id exists.
    fn contains(&self, id: &IntentId) -> bool;

    /// All records, oldest first.
    fn all(&self) -> Vec<VerifiedRecord>;

    /// Records bound to a chat-platform account id, oldest first.
    fn find_by_external_id(&self, external_id: &str) -> Vec<VerifiedRecord> {
        self.all()
            .into_iter()
            .filter(|r| r.intent.identity.external_id == external_id)
            .collect()
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retry persisting the collection if an earlier snapshot failed.
    fn flush(&self) -> Result<(), StoreError>;
}
