//! Whole-collection JSON files.

use dustproof_store::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// One collection's file on disk.
#[derive(Debug)]
pub(crate) struct SnapshotFile {
    path: PathBuf,
    collection: &'static str,
}

impl SnapshotFile {
    pub(crate) fn new(path: PathBuf, collection: &'static str) -> Self {
        Self { path, collection }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Read the collection, degrading every failure to an empty collection.
    pub(crate) fn load<T: DeserializeOwned>(&self) -> Vec<T> {
        match self.try_load() {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(
                    collection = self.collection,
                    path = %self.path.display(),
                    error = %e,
                    "unreadable collection, starting empty"
                );
                self.quarantine();
                Vec::new()
            }
        }
    }

    fn try_load<T: DeserializeOwned>(&self) -> Result<Vec<T>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Read {
                    collection: self.collection,
                    reason: e.to_string(),
                })
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Read {
            collection: self.collection,
            reason: e.to_string(),
        })
    }

    /// Move an unreadable file aside so the next write does not destroy it.
    fn quarantine(&self) {
        if !self.path.exists() {
            return;
        }
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let mut target = self.path.clone().into_os_string();
        target.push(format!(".corrupt-{millis}"));
        match fs::rename(&self.path, &target) {
            Ok(()) => tracing::warn!(
                collection = self.collection,
                moved_to = %Path::new(&target).display(),
                "quarantined unreadable collection"
            ),
            Err(e) => tracing::warn!(
                collection = self.collection,
                error = %e,
                "could not quarantine unreadable collection"
            ),
        }
    }

    /// Replace the file with a snapshot of `items`.
    pub(crate) fn write<T: Serialize>(&self, items: &[T]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(items)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let write_err = |e: std::io::Error| StoreError::Write {
            collection: self.collection,
            reason: e.to_string(),
        };
        let mut file = fs::File::create(&tmp).map_err(write_err)?;
        file.write_all(&bytes).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);
        fs::rename(&tmp, &self.path).map_err(write_err)
    }
}
