//! Nullable stores: thread-safe in-memory storage for testing.

use dustproof_store::{IntentStore, SignatureStore, StoreError, VerifiedStore};
use dustproof_types::{IntentId, IntentState, PaymentIntent, Timestamp, TxSignature, VerifiedRecord};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// In-memory pending intents.
///
/// [`NullIntentStore::fail_inserts`] makes inserts fail, to exercise the
/// issuer's error path.
#[derive(Default)]
pub struct NullIntentStore {
    intents: Mutex<Vec<PaymentIntent>>,
    fail_inserts: AtomicBool,
}

impl NullIntentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }
}

impl IntentStore for NullIntentStore {
    fn insert(&self, intent: PaymentIntent) -> Result<(), StoreError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("null store refuses inserts".into()));
        }
        let mut intents = self.intents.lock().unwrap();
        if intents.iter().any(|i| i.id == intent.id) {
            return Err(StoreError::Duplicate(intent.id.to_string()));
        }
        intents.push(intent);
        Ok(())
    }

    fn pending(&self) -> Vec<PaymentIntent> {
        self.intents.lock().unwrap().clone()
    }

    fn contains(&self, id: &IntentId) -> bool {
        self.intents.lock().unwrap().iter().any(|i| &i.id == id)
    }

    fn remove(&self, ids: &[IntentId]) -> Result<usize, StoreError> {
        let mut intents = self.intents.lock().unwrap();
        let before = intents.len();
        intents.retain(|i| !ids.contains(&i.id));
        Ok(before - intents.len())
    }

    fn remove_expired(&self, now: Timestamp) -> Result<Vec<PaymentIntent>, StoreError> {
        let mut intents = self.intents.lock().unwrap();
        let (expired, live): (Vec<_>, Vec<_>) = std::mem::take(&mut *intents)
            .into_iter()
            .partition(|i| i.is_expired(now));
        *intents = live;
        Ok(expired
            .into_iter()
            .map(|mut i| {
                i.state = IntentState::Expired;
                i
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.intents.lock().unwrap().len()
    }

    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// In-memory verified log.
#[derive(Default)]
pub struct NullVerifiedStore {
    records: Mutex<Vec<VerifiedRecord>>,
}

impl NullVerifiedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VerifiedStore for NullVerifiedStore {
    fn append(&self, records: &[VerifiedRecord]) -> Result<usize, StoreError> {
        let mut stored = self.records.lock().unwrap();
        let mut appended = 0;
        for record in records {
            if stored.iter().any(|r| r.id() == record.id()) {
                continue;
            }
            stored.push(record.clone());
            appended += 1;
        }
        Ok(appended)
    }

    fn contains(&self, id: &IntentId) -> bool {
        self.records.lock().unwrap().iter().any(|r| r.id() == id)
    }

    fn all(&self) -> Vec<VerifiedRecord> {
        self.records.lock().unwrap().clone()
    }

    fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// In-memory, unbounded consumed-signature set.
#[derive(Default)]
pub struct NullSignatureStore {
    signatures: Mutex<HashSet<TxSignature>>,
}

impl NullSignatureStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignatureStore for NullSignatureStore {
    fn contains(&self, signature: &TxSignature) -> bool {
        self.signatures.lock().unwrap().contains(signature)
    }

    fn insert_many(&self, signatures: &[TxSignature]) -> Result<usize, StoreError> {
        let mut set = self.signatures.lock().unwrap();
        Ok(signatures
            .iter()
            .filter(|s| set.insert((*s).clone()))
            .count())
    }

    fn len(&self) -> usize {
        self.signatures.lock().unwrap().len()
    }

    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
