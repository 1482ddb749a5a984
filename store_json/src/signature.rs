//! Consumed signatures as a bounded FIFO JSON snapshot.
//!
//! When full, the oldest signature is evicted to make room. The chain poller
//! only ever looks at the most recent handful of signatures, so a capacity in
//! the thousands keeps every signature it can still see.

use crate::collection::PersistedCollection;
use crate::snapshot::SnapshotFile;
use dustproof_store::{SignatureStore, StoreError};
use dustproof_types::TxSignature;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Default number of consumed signatures retained.
pub const DEFAULT_CONSUMED_CAPACITY: usize = 10_000;

pub struct JsonSignatureStore {
    collection: PersistedCollection<TxSignature>,
    index: Mutex<HashSet<TxSignature>>,
    capacity: usize,
}

impl JsonSignatureStore {
    pub fn open(path: PathBuf, capacity: usize) -> Self {
        let collection = PersistedCollection::open(SnapshotFile::new(path, "consumed signatures"));
        let index = {
            let mut guard = collection.lock();
            if guard.items.len() > capacity {
                let excess = guard.items.len() - capacity;
                guard.items.drain(..excess).for_each(drop);
            }
            let index: HashSet<TxSignature> = guard.items.iter().cloned().collect();
            index
        };
        Self {
            collection,
            index: Mutex::new(index),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl SignatureStore for JsonSignatureStore {
    fn contains(&self, signature: &TxSignature) -> bool {
        self.index
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(signature)
    }

    fn insert_many(&self, signatures: &[TxSignature]) -> Result<usize, StoreError> {
        if self.capacity == 0 {
            return Ok(0);
        }
        // Lock order: collection, then index.
        let mut guard = self.collection.lock();
        let mut index = self.index.lock().unwrap_or_else(PoisonError::into_inner);
        let mut inserted = 0;
        for signature in signatures {
            if index.contains(signature) {
                continue;
            }
            if guard.items.len() >= self.capacity {
                let evicted = guard.items.remove(0);
                index.remove(&evicted);
            }
            index.insert(signature.clone());
            guard.items.push(signature.clone());
            inserted += 1;
        }
        drop(index);
        if inserted > 0 {
            self.collection.commit(&mut guard);
        }
        Ok(inserted)
    }

    fn len(&self) -> usize {
        self.collection.lock().items.len()
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.collection.flush()
    }
}
