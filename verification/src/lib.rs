//! Payment-intent issuance and reconciliation.
//!
//! A user proves ownership of a wallet by transferring an amount so small and
//! so specific that the amount itself is the verification token:
//!
//! 1. **Issue**: [`Issuer`] validates the identity, draws an amount from
//!    [`AmountAllocator`], and writes a pending intent with a fixed TTL.
//! 2. **Reconcile**: on its own timer, [`Reconciler`] polls the chain for new
//!    transfers to the receiving address, matches each against the pending
//!    intents, moves matches into the verified log, and emits one
//!    [`VerifiedEvent`](dustproof_types::VerifiedEvent) per verification.
//! 3. **Expire**: [`ExpirySweeper`] drops intents whose TTL has passed.
//!
//! Issuer and reconciler never call each other; they share only the stores.

pub mod allocator;
pub mod error;
pub mod event;
pub mod issuer;
pub mod matcher;
pub mod metrics;
pub mod reconciler;
pub mod sweep;

pub use allocator::AmountAllocator;
pub use error::VerifyError;
pub use event::VerifiedEventBus;
pub use issuer::{IntentRequest, Issuer, PaymentInstructions, DEFAULT_INTENT_TTL};
pub use matcher::{find_matches, intent_matches, CollisionPolicy};
pub use metrics::VerifierMetrics;
pub use reconciler::{ReconcileReport, Reconciler, TickOutcome};
pub use sweep::ExpirySweeper;
