//! JSON snapshot storage backend.
//!
//! Each collection lives in memory behind its own mutex and is written
//! through to a JSON file after every mutation. Snapshots are written to a
//! temporary sibling and renamed into place, so an external reader sees
//! either the previous or the next complete collection.
//!
//! Loading is forgiving: a missing or empty file is an empty collection, and
//! an unparseable file is moved aside to `<name>.corrupt-<millis>` and
//! treated as empty rather than failing startup.

mod collection;
pub mod intent;
pub mod signature;
mod snapshot;
pub mod verified;

pub use intent::JsonIntentStore;
pub use signature::JsonSignatureStore;
pub use verified::JsonVerifiedStore;

use dustproof_store::StoreError;
use std::path::Path;

/// File name of the pending intent collection.
pub const PENDING_FILE: &str = "pending.json";
/// File name of the verified record collection.
pub const VERIFIED_FILE: &str = "verified.json";
/// File name of the consumed signature collection.
pub const CONSUMED_FILE: &str = "consumed.json";

/// The three stores backed by one data directory.
pub struct JsonStores {
    pub intents: JsonIntentStore,
    pub verified: JsonVerifiedStore,
    pub signatures: JsonSignatureStore,
}

impl JsonStores {
    /// Open (creating if needed) all collections under `data_dir`.
    pub fn open(data_dir: &Path, consumed_capacity: usize) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir).map_err(|e| {
            StoreError::Backend(format!("cannot create {}: {e}", data_dir.display()))
        })?;
        Ok(Self {
            intents: JsonIntentStore::open(data_dir.join(PENDING_FILE)),
            verified: JsonVerifiedStore::open(data_dir.join(VERIFIED_FILE)),
            signatures: JsonSignatureStore::open(data_dir.join(CONSUMED_FILE), consumed_capacity),
        })
    }
}
