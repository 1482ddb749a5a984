//! Prometheus metrics for the verifier.
//!
//! [`VerifierMetrics`] owns a dedicated [`Registry`] that the HTTP
//! `/metrics` endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};

/// Central collection of verifier metrics.
pub struct VerifierMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Intents written by the issuer.
    pub intents_created: IntCounter,
    /// Intents moved into the verified log.
    pub intents_verified: IntCounter,
    /// Intents dropped by the expiry sweep.
    pub intents_expired: IntCounter,
    /// Signatures examined by the reconciler (consumed after the tick).
    pub signatures_examined: IntCounter,
    /// Poll ticks aborted by an upstream failure.
    pub poll_failures: IntCounter,
    /// Store mutations or flushes that failed to reach disk.
    pub store_write_failures: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Pending intents after the last mutation.
    pub pending_intents: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Wall time of a full reconcile tick, in milliseconds.
    pub tick_duration_ms: Histogram,
}

impl VerifierMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let intents_created = register_int_counter_with_registry!(
            Opts::new("dustproof_intents_created_total", "Total payment intents issued"),
            registry
        )
        .expect("failed to register intents_created counter");

        let intents_verified = register_int_counter_with_registry!(
            Opts::new(
                "dustproof_intents_verified_total",
                "Total intents verified by an on-chain transfer"
            ),
            registry
        )
        .expect("failed to register intents_verified counter");

        let intents_expired = register_int_counter_with_registry!(
            Opts::new(
                "dustproof_intents_expired_total",
                "Total intents dropped after their TTL"
            ),
            registry
        )
        .expect("failed to register intents_expired counter");

        let signatures_examined = register_int_counter_with_registry!(
            Opts::new(
                "dustproof_signatures_examined_total",
                "Total transaction signatures examined"
            ),
            registry
        )
        .expect("failed to register signatures_examined counter");

        let poll_failures = register_int_counter_with_registry!(
            Opts::new(
                "dustproof_poll_failures_total",
                "Total poll ticks aborted by an RPC failure"
            ),
            registry
        )
        .expect("failed to register poll_failures counter");

        let store_write_failures = register_int_counter_with_registry!(
            Opts::new(
                "dustproof_store_write_failures_total",
                "Total store writes that failed to persist"
            ),
            registry
        )
        .expect("failed to register store_write_failures counter");

        let pending_intents = register_int_gauge_with_registry!(
            Opts::new("dustproof_pending_intents", "Current number of pending intents"),
            registry
        )
        .expect("failed to register pending_intents gauge");

        // 1 ms to ~16 s.
        let tick_duration_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "dustproof_tick_duration_ms",
                "Reconcile tick duration in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(1.0, 2.0, 15).unwrap()),
            registry
        )
        .expect("failed to register tick_duration_ms histogram");

        Self {
            registry,
            intents_created,
            intents_verified,
            intents_expired,
            signatures_examined,
            poll_failures,
            store_write_failures,
            pending_intents,
            tick_duration_ms,
        }
    }

    /// Set the pending gauge from a store length.
    pub fn set_pending(&self, len: usize) {
        self.pending_intents
            .set(i64::try_from(len).unwrap_or(i64::MAX));
    }

    /// Render every metric in the text exposition format.
    pub fn encode(&self) -> String {
        let mut buf = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buf) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

impl Default for VerifierMetrics {
    fn default() -> Self {
        Self::new()
    }
}
