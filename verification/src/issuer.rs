//! The issuance side of the protocol.
//!
//! `create_intent` validates the identity, sweeps expired intents, draws an
//! amount, and persists a pending intent. Only the payment instructions are
//! returned: the intent id stays internal because the amount is the lookup
//! key.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use dustproof_store::{IntentStore, StoreError};
use dustproof_types::{
    Clock, Identity, IntentId, IntentState, Lamports, PaymentIntent, RandomSource, Timestamp,
    WalletAddress,
};

use crate::{AmountAllocator, ExpirySweeper, VerifierMetrics, VerifyError};

/// Fixed intent lifetime.
pub const DEFAULT_INTENT_TTL: Duration = Duration::from_secs(15 * 60);

/// Regenerations allowed when a fresh id is already taken.
const MAX_ID_ATTEMPTS: u32 = 4;

/// Raw issuance request as posted by the web form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRequest {
    #[serde(default)]
    pub discord_id: Option<String>,
    #[serde(default)]
    pub twitter_handle: Option<String>,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

/// What the user must do: send exactly `amount` to `receiving_address`
/// before `expires_at`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstructions {
    pub amount: Lamports,
    pub receiving_address: WalletAddress,
    pub expires_at: Timestamp,
}

pub struct Issuer {
    intents: Arc<dyn IntentStore>,
    allocator: AmountAllocator,
    sweeper: ExpirySweeper,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    metrics: Arc<VerifierMetrics>,
    receiving_address: WalletAddress,
    ttl: Duration,
}

impl Issuer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        intents: Arc<dyn IntentStore>,
        allocator: AmountAllocator,
        sweeper: ExpirySweeper,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
        metrics: Arc<VerifierMetrics>,
        receiving_address: WalletAddress,
        ttl: Duration,
    ) -> Self {
        Self {
            intents,
            allocator,
            sweeper,
            clock,
            random,
            metrics,
            receiving_address,
            ttl,
        }
    }

    pub fn receiving_address(&self) -> &WalletAddress {
        &self.receiving_address
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a new pending intent for the identity in `request`.
    pub fn create_intent(&self, request: &IntentRequest) -> Result<PaymentInstructions, VerifyError> {
        let identity = Identity::parse(
            request.discord_id.as_deref(),
            request.wallet_address.as_deref(),
            request.twitter_handle.as_deref(),
        )?;

        // A failed sweep must not block issuance; the timer retries it.
        if let Err(e) = self.sweeper.sweep() {
            tracing::warn!(error = %e, "opportunistic sweep failed");
        }

        let in_use: HashSet<Lamports> = self.intents.pending().iter().map(|i| i.amount).collect();
        let amount = self.allocator.allocate(&in_use);
        let now = self.clock.now();
        let expires_at = now.saturating_add(self.ttl);

        let mut intent = PaymentIntent {
            id: self.fresh_id(),
            identity,
            amount,
            receiving_address: Some(self.receiving_address.clone()),
            created_at: now,
            expires_at,
            state: IntentState::Pending,
        };

        let mut attempt = 1;
        loop {
            match self.intents.insert(intent.clone()) {
                Ok(()) => break,
                Err(StoreError::Duplicate(id)) if attempt < MAX_ID_ATTEMPTS => {
                    tracing::warn!(%id, attempt, "intent id already pending, regenerating");
                    intent.id = self.fresh_id();
                    attempt += 1;
                }
                Err(StoreError::Duplicate(_)) => return Err(VerifyError::IdExhausted(attempt)),
                Err(e) => {
                    self.metrics.store_write_failures.inc();
                    return Err(e.into());
                }
            }
        }

        self.metrics.intents_created.inc();
        self.metrics.set_pending(self.intents.len());
        tracing::info!(
            id = %intent.id,
            external_id = %intent.identity.external_id,
            wallet = %intent.identity.wallet_address,
            %amount,
            expires_at = expires_at.as_millis(),
            "payment intent issued"
        );

        Ok(PaymentInstructions {
            amount,
            receiving_address: self.receiving_address.clone(),
            expires_at,
        })
    }

    fn fresh_id(&self) -> IntentId {
        let mut bytes = [0u8; 16];
        self.random.fill_bytes(&mut bytes);
        IntentId::from_bytes(bytes)
    }
}
