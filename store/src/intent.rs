//! Pending intent storage trait.

use crate::StoreError;
use dustproof_types::{IntentId, PaymentIntent, Timestamp};

/// The collection of pending verification intents, in insertion order.
///
/// Every mutating call is one read-modify-write cycle under the store's
/// lock, followed by a write-through snapshot. A failed snapshot leaves the
/// in-memory collection authoritative and marks the store dirty; it is not
/// reported as an error of the mutation.
pub trait IntentStore: Send + Sync {
    /// Append a new pending intent. Fails with [`StoreError::Duplicate`] if
    /// an intent with the same id is already pending.
    fn insert(&self, intent: PaymentIntent) -> Result<(), StoreError>;

    /// Snapshot of all pending intents in insertion order.
    fn pending(&self) -> Vec<PaymentIntent>;

    /// Whether an intent with this id is pending.
    fn contains(&self, id: &IntentId) -> bool;

    /// Remove the given ids. Ids that are already absent are ignored.
    /// Returns the number actually removed.
    fn remove(&self, ids: &[IntentId]) -> Result<usize, StoreError>;

    /// Remove and return every intent whose `expires_at <= now`.
    fn remove_expired(&self, now: Timestamp) -> Result<Vec<PaymentIntent>, StoreError>;

    /// Number of pending intents.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retry persisting the collection if an earlier snapshot failed.
    fn flush(&self) -> Result<(), StoreError>;
}
