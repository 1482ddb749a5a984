//! Expiry sweep: drop pending intents whose TTL has passed.

use std::sync::Arc;

use dustproof_store::IntentStore;
use dustproof_types::Clock;

use crate::{VerifierMetrics, VerifyError};

/// Removes expired intents. Cheap to clone; the issuer holds one to sweep
/// opportunistically and the node runs another on its own timer.
#[derive(Clone)]
pub struct ExpirySweeper {
    intents: Arc<dyn IntentStore>,
    clock: Arc<dyn Clock>,
    metrics: Arc<VerifierMetrics>,
}

impl ExpirySweeper {
    pub fn new(
        intents: Arc<dyn IntentStore>,
        clock: Arc<dyn Clock>,
        metrics: Arc<VerifierMetrics>,
    ) -> Self {
        Self {
            intents,
            clock,
            metrics,
        }
    }

    /// Delete every pending intent with `expiresAt <= now`, returning how
    /// many were removed.
    pub fn sweep(&self) -> Result<usize, VerifyError> {
        let expired = self.intents.remove_expired(self.clock.now()).map_err(|e| {
            self.metrics.store_write_failures.inc();
            e
        })?;
        let removed = expired.len();
        if removed > 0 {
            self.metrics.intents_expired.inc_by(removed as u64);
            for intent in &expired {
                tracing::debug!(
                    id = %intent.id,
                    external_id = %intent.identity.external_id,
                    amount = %intent.amount,
                    "intent expired"
                );
            }
            tracing::info!(removed, "swept expired intents");
        }
        self.metrics.set_pending(self.intents.len());
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustproof_nullables::{NullClock, NullIntentStore};
    use dustproof_types::{Identity, IntentId, IntentState, Lamports, PaymentIntent, Timestamp, WalletAddress};
    use std::time::Duration;

    fn intent(id: &str, expires_at: u64) -> PaymentIntent {
        PaymentIntent {
            id: IntentId::new(id),
            identity: Identity {
                wallet_address: WalletAddress::new("W1"),
                external_id: id.into(),
                secondary_handle: None,
            },
            amount: Lamports::new(10),
            receiving_address: None,
            created_at: Timestamp::new(0),
            expires_at: Timestamp::new(expires_at),
            state: IntentState::Pending,
        }
    }

    #[test]
    fn sweep_removes_only_expired_and_counts_them() {
        let store = Arc::new(NullIntentStore::new());
        store.insert(intent("a", 1_000)).unwrap();
        store.insert(intent("b", 5_000)).unwrap();
        let clock = Arc::new(NullClock::new(0));
        let metrics = Arc::new(VerifierMetrics::new());
        let sweeper = ExpirySweeper::new(store.clone(), clock.clone(), metrics.clone());

        assert_eq!(sweeper.sweep().unwrap(), 0);
        clock.advance(Duration::from_millis(1_000));
        assert_eq!(sweeper.sweep().unwrap(), 1);
        assert!(store.contains(&IntentId::new("b")));
        assert_eq!(metrics.intents_expired.get(), 1);
        assert_eq!(metrics.pending_intents.get(), 1);
    }
}
