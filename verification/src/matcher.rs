//! The four-predicate match between an observation and pending intents.

use serde::{Deserialize, Serialize};

use dustproof_types::{IntentState, PaymentIntent, Timestamp, TransferObservation};

/// What to do when several pending intents match one observation.
///
/// Intents sharing a (wallet, amount) pair are possible because amounts are
/// random, not unique by construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Every matching intent is verified by the one transfer.
    #[default]
    VerifyAll,
    /// Only the earliest-inserted matching intent is verified.
    FirstMatch,
}

/// Whether `obs` satisfies `intent` at `now`:
/// 1. the intent is pending and unexpired,
/// 2. its receiving address, if any, is the observed destination,
/// 3. the observed source is the intent's wallet,
/// 4. the observed lamports equal the intent's amount exactly.
pub fn intent_matches(intent: &PaymentIntent, obs: &TransferObservation, now: Timestamp) -> bool {
    intent.state == IntentState::Pending
        && !intent.is_expired(now)
        && intent
            .receiving_address
            .as_ref()
            .map_or(true, |addr| addr == &obs.destination)
        && intent.identity.wallet_address == obs.source
        && intent.amount == obs.lamports
}

/// Indices into `pending` (insertion order) of the intents `obs` verifies.
pub fn find_matches(
    pending: &[PaymentIntent],
    obs: &TransferObservation,
    now: Timestamp,
    policy: CollisionPolicy,
) -> Vec<usize> {
    let matching = pending
        .iter()
        .enumerate()
        .filter(|(_, intent)| intent_matches(intent, obs, now))
        .map(|(idx, _)| idx);
    match policy {
        CollisionPolicy::VerifyAll => matching.collect(),
        CollisionPolicy::FirstMatch => matching.take(1).collect(),
    }
}
