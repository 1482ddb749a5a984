//! Storage traits for the verification protocol.
//!
//! Three logical collections, each owned by a single store and guarded by a
//! single per-collection lock:
//! - pending intents ([`IntentStore`])
//! - verified records ([`VerifiedStore`])
//! - consumed transfer signatures ([`SignatureStore`])
//!
//! Every backend (JSON snapshots, in-memory for testing) implements these
//! traits. The rest of the workspace depends only on the traits.

pub mod error;
pub mod intent;
pub mod signature;
pub mod verified;

pub use error::StoreError;
pub use intent::IntentStore;
pub use signature::SignatureStore;
pub use verified::VerifiedStore;
