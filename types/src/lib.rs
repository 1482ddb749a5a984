//! Fundamental types for the dustproof verification protocol.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! amounts, timestamps, addresses, signatures, intents, observations, and the
//! verified-identity event pushed to subscribers.

pub mod address;
pub mod amount;
pub mod error;
pub mod event;
pub mod intent;
pub mod observation;
pub mod random;
pub mod signature;
pub mod time;

pub use address::WalletAddress;
pub use amount::Lamports;
pub use error::ValidationError;
pub use event::{EventStatus, VerifiedEvent};
pub use intent::{Identity, IntentId, IntentState, PaymentIntent, VerifiedRecord};
pub use observation::TransferObservation;
pub use random::{RandomSource, ThreadRandom};
pub use signature::TxSignature;
pub use time::{Clock, SystemClock, Timestamp};
