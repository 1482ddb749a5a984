//! Consumed signature storage trait.

use crate::StoreError;
use dustproof_types::TxSignature;

/// The set of transfer signatures that have already been examined.
///
/// Consumption is monotonic: once inserted, a signature is reported as
/// consumed until it is evicted by a bounded backend's capacity.
pub trait SignatureStore: Send + Sync {
    fn contains(&self, signature: &TxSignature) -> bool;

    /// Mark signatures consumed. Returns how many were newly inserted.
    fn insert_many(&self, signatures: &[TxSignature]) -> Result<usize, StoreError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retry persisting the collection if an earlier snapshot failed.
    fn flush(&self) -> Result<(), StoreError>;
}
