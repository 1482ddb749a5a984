//! In-memory collection with write-through persistence.

use crate::snapshot::SnapshotFile;
use dustproof_store::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub(crate) struct Items<T> {
    pub(crate) items: Vec<T>,
    dirty: bool,
}

/// A collection that is authoritative in memory and mirrored to disk.
pub(crate) struct PersistedCollection<T> {
    file: SnapshotFile,
    inner: Mutex<Items<T>>,
}

impl<T: Serialize + DeserializeOwned> PersistedCollection<T> {
    pub(crate) fn open(file: SnapshotFile) -> Self {
        let items = file.load();
        Self {
            file,
            inner: Mutex::new(Items {
                items,
                dirty: false,
            }),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Items<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist the current contents. A failure is logged and leaves the
    /// collection dirty; memory stays authoritative until a write succeeds.
    pub(crate) fn commit(&self, guard: &mut Items<T>) {
        match self.file.write(&guard.items) {
            Ok(()) => guard.dirty = false,
            Err(e) => {
                guard.dirty = true;
                tracing::warn!(
                    path = %self.file.path().display(),
                    error = %e,
                    "snapshot write failed, memory is ahead of disk"
                );
            }
        }
    }

    /// Rewrite the snapshot if an earlier commit failed.
    pub(crate) fn flush(&self) -> Result<(), StoreError> {
        let mut guard = self.lock();
        if !guard.dirty {
            return Ok(());
        }
        self.file.write(&guard.items)?;
        guard.dirty = false;
        Ok(())
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.lock().dirty
    }
}
