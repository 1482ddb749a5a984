//! Verified records as a JSON snapshot.

use crate::collection::PersistedCollection;
use crate::snapshot::SnapshotFile;
use dustproof_store::{StoreError, VerifiedStore};
use dustproof_types::{IntentId, VerifiedRecord};
use std::path::PathBuf;

pub struct JsonVerifiedStore {
    collection: PersistedCollection<VerifiedRecord>,
}

impl JsonVerifiedStore {
    pub fn open(path: PathBuf) -> Self {
        Self {
            collection: PersistedCollection::open(SnapshotFile::new(path, "verified records")),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.collection.is_dirty()
    }
}

impl VerifiedStore for JsonVerifiedStore {
    fn append(&self, records: &[VerifiedRecord]) -> Result<usize, StoreError> {
        let mut guard = self.collection.lock();
        let mut appended = 0;
        for record in records {
            if guard.items.iter().any(|r| r.id() == record.id()) {
                tracing::debug!(id = %record.id(), "already verified, skipping");
                continue;
            }
            guard.items.push(record.clone());
            appended += 1;
        }
        if appended > 0 {
            self.collection.commit(&mut guard);
        }
        Ok(appended)
    }

    fn contains(&self, id: &IntentId) -> bool {
        self.collection.lock().items.iter().any(|r| r.id() == id)
    }

    fn all(&self) -> Vec<VerifiedRecord> {
        self.collection.lock().items.clone()
    }

    fn len(&self) -> usize {
        self.collection.lock().items.len()
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.collection.flush()
    }
}
