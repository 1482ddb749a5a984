//! Matching of observed transfers against pending intents.
//!
//! A tick polls the chain, then for every examined signature (oldest first):
//! matches each observation against a snapshot of the pending intents,
//! appends the matches to the verified log, removes them from the pending
//! set, emits one event per verification, and finally marks the signature
//! consumed. The verified append precedes the pending removal, so a crash
//! between the two leaves a record in both collections; [`Reconciler::repair`]
//! resolves that on the next start.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::Instrument;

use dustproof_chain::{ChainPoller, ChainSource, ExaminedSignature};
use dustproof_store::{IntentStore, SignatureStore, StoreError, VerifiedStore};
use dustproof_types::{Clock, IntentId, Timestamp, VerifiedEvent, VerifiedRecord};

use crate::{find_matches, CollisionPolicy, VerifiedEventBus, VerifierMetrics, VerifyError};

/// What one completed tick did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Signatures examined and consumed.
    pub examined: usize,
    /// Transfers to the receiving address found in them.
    pub observations: usize,
    /// Intents verified, in verification order.
    pub verified: Vec<VerifiedRecord>,
    /// Signatures dropped because they were already consumed.
    pub skipped: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Completed(ReconcileReport),
    /// The previous tick was still in flight.
    Skipped,
}

pub struct Reconciler<C> {
    poller: ChainPoller<C>,
    state: Arc<ReconcileState>,
    in_flight: Mutex<()>,
}

/// Everything a tick mutates. Shared with the blocking pool, where the
/// snapshot writes run.
struct ReconcileState {
    intents: Arc<dyn IntentStore>,
    verified: Arc<dyn VerifiedStore>,
    signatures: Arc<dyn SignatureStore>,
    bus: VerifiedEventBus,
    clock: Arc<dyn Clock>,
    policy: CollisionPolicy,
    metrics: Arc<VerifierMetrics>,
}

impl<C: ChainSource> Reconciler<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        poller: ChainPoller<C>,
        intents: Arc<dyn IntentStore>,
        verified: Arc<dyn VerifiedStore>,
        signatures: Arc<dyn SignatureStore>,
        bus: VerifiedEventBus,
        clock: Arc<dyn Clock>,
        policy: CollisionPolicy,
        metrics: Arc<VerifierMetrics>,
    ) -> Self {
        Self {
            poller,
            state: Arc::new(ReconcileState {
                intents,
                verified,
                signatures,
                bus,
                clock,
                policy,
                metrics,
            }),
            in_flight: Mutex::new(()),
        }
    }

    pub fn poller(&self) -> &ChainPoller<C> {
        &self.poller
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.state.policy
    }

    /// Run one poll-and-match pass.
    ///
    /// Non-reentrant: if the previous tick has not finished, returns
    /// [`TickOutcome::Skipped`] without touching the chain. An upstream
    /// failure aborts the tick before any store is mutated.
    pub async fn tick(&self) -> Result<TickOutcome, VerifyError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::debug!("previous reconcile tick still running, skipping");
            return Ok(TickOutcome::Skipped);
        };

        async {
            let started = Instant::now();
            let state = &self.state;
            let examined = match self
                .poller
                .poll(|s| state.signatures.contains(s), state.clock.now())
                .await
            {
                Ok(examined) => examined,
                Err(e) => {
                    state.metrics.poll_failures.inc();
                    tracing::warn!(error = %e, "poll failed, retrying next tick");
                    return Err(VerifyError::from(e));
                }
            };

            // Snapshot writes fsync; keep them off the async workers.
            let blocking = Arc::clone(state);
            let applied = tokio::task::spawn_blocking(move || {
                let now = blocking.clock.now();
                blocking.apply(examined, now)
            })
            .await
            .map_err(|e| VerifyError::Task(e.to_string()))
            .and_then(|applied| applied);
            let report = match applied {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(error = %e, "reconcile tick aborted");
                    return Err(e);
                }
            };
            state
                .metrics
                .tick_duration_ms
                .observe(started.elapsed().as_secs_f64() * 1000.0);
            if report.examined > 0 {
                tracing::info!(
                    examined = report.examined,
                    observations = report.observations,
                    verified = report.verified.len(),
                    "reconcile tick complete"
                );
            }
            Ok(TickOutcome::Completed(report))
        }
        .instrument(tracing::info_span!("reconcile_tick"))
        .await
    }

    /// Apply examined signatures to the stores at `now`.
    ///
    /// Each signature is consumed once its observations are applied, so an
    /// error part way through leaves earlier signatures consumed and later
    /// ones for the next tick. Signatures already consumed are skipped,
    /// which makes a replayed batch a no-op.
    pub fn apply(
        &self,
        examined: Vec<ExaminedSignature>,
        now: Timestamp,
    ) -> Result<ReconcileReport, VerifyError> {
        self.state.apply(examined, now)
    }

    /// Remove pending intents that already have a verified record. Returns
    /// how many were removed.
    pub fn repair(&self) -> Result<usize, VerifyError> {
        self.state.repair()
    }
}

impl ReconcileState {
    fn apply(
        &self,
        examined: Vec<ExaminedSignature>,
        now: Timestamp,
    ) -> Result<ReconcileReport, VerifyError> {
        let mut report = ReconcileReport::default();

        for ExaminedSignature {
            signature,
            observations,
        } in examined
        {
            if self.signatures.contains(&signature) {
                report.skipped += 1;
                continue;
            }

            for obs in &observations {
                report.observations += 1;
                let pending = self.intents.pending();
                let matched = find_matches(&pending, obs, now, self.policy);
                if matched.is_empty() {
                    tracing::debug!(
                        %signature,
                        source = %obs.source,
                        lamports = %obs.lamports,
                        "transfer matches no pending intent"
                    );
                    continue;
                }
                if matched.len() > 1 {
                    tracing::warn!(
                        %signature,
                        count = matched.len(),
                        "one transfer matches several pending intents"
                    );
                }

                let records: Vec<VerifiedRecord> = matched
                    .iter()
                    .map(|&idx| pending[idx].to_verified(signature.clone(), now))
                    .collect();
                let ids: Vec<IntentId> = records.iter().map(|r| r.id().clone()).collect();

                self.verified.append(&records).map_err(|e| self.write_failed(e))?;
                self.intents.remove(&ids).map_err(|e| self.write_failed(e))?;

                for record in &records {
                    self.metrics.intents_verified.inc();
                    tracing::info!(
                        id = %record.id(),
                        external_id = %record.intent.identity.external_id,
                        wallet = %record.intent.identity.wallet_address,
                        amount = %record.intent.amount,
                        %signature,
                        "intent verified"
                    );
                    self.bus.emit(&VerifiedEvent::from_record(record));
                }
                report.verified.extend(records);
            }

            self.signatures
                .insert_many(std::slice::from_ref(&signature))
                .map_err(|e| self.write_failed(e))?;
            self.metrics.signatures_examined.inc();
            report.examined += 1;
        }

        self.metrics.set_pending(self.intents.len());
        Ok(report)
    }

    fn repair(&self) -> Result<usize, VerifyError> {
        let stale: Vec<IntentId> = self
            .intents
            .pending()
            .into_iter()
            .filter(|i| self.verified.contains(&i.id))
            .map(|i| i.id)
            .collect();
        if stale.is_empty() {
            return Ok(0);
        }
        let removed = self.intents.remove(&stale).map_err(|e| self.write_failed(e))?;
        tracing::warn!(removed, "removed pending intents that were already verified");
        self.metrics.set_pending(self.intents.len());
        Ok(removed)
    }

    fn write_failed(&self, e: StoreError) -> VerifyError {
        self.metrics.store_write_failures.inc();
        VerifyError::Store(e)
    }
}
