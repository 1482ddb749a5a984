//! Pending intents as a JSON snapshot.

use crate::collection::PersistedCollection;
use crate::snapshot::SnapshotFile;
use dustproof_store::{IntentStore, StoreError};
use dustproof_types::{IntentId, IntentState, PaymentIntent, Timestamp};
use std::path::PathBuf;

pub struct JsonIntentStore {
    collection: PersistedCollection<PaymentIntent>,
}

impl JsonIntentStore {
    pub fn open(path: PathBuf) -> Self {
        Self {
            collection: PersistedCollection::open(SnapshotFile::new(path, "pending intents")),
        }
    }

    /// Whether memory holds changes that have not reached disk.
    pub fn is_dirty(&self) -> bool {
        self.collection.is_dirty()
    }
}

impl IntentStore for JsonIntentStore {
    fn insert(&self, intent: PaymentIntent) -> Result<(), StoreError> {
        let mut guard = self.collection.lock();
        if guard.items.iter().any(|i| i.id == intent.id) {
            return Err(StoreError::Duplicate(intent.id.to_string()));
        }
        guard.items.push(intent);
        self.collection.commit(&mut guard);
        Ok(())
    }

    fn pending(&self) -> Vec<PaymentIntent> {
        self.collection.lock().items.clone()
    }

    fn contains(&self, id: &IntentId) -> bool {
        self.collection.lock().items.iter().any(|i| &i.id == id)
    }

    fn remove(&self, ids: &[IntentId]) -> Result<usize, StoreError> {
        let mut guard = self.collection.lock();
        let before = guard.items.len();
        guard.items.retain(|i| !ids.contains(&i.id));
        let removed = before - guard.items.len();
        if removed > 0 {
            self.collection.commit(&mut guard);
        }
        Ok(removed)
    }

    fn remove_expired(&self, now: Timestamp) -> Result<Vec<PaymentIntent>, StoreError> {
        let mut guard = self.collection.lock();
        let (expired, live): (Vec<_>, Vec<_>) = std::mem::take(&mut guard.items)
            .into_iter()
            .partition(|i| i.is_expired(now));
        guard.items = live;
        if !expired.is_empty() {
            self.collection.commit(&mut guard);
        }
        Ok(expired
            .into_iter()
            .map(|mut i| {
                i.state = IntentState::Expired;
                i
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.collection.lock().items.len()
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.collection.flush()
    }
}
