//! The verifier node: owns the stores and runs the reconcile timer, the
//! sweep timer, and both servers until shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use dustproof_chain::{ChainPoller, ChainSource, SolanaRpcClient};
use dustproof_rpc::{RpcServer, RpcState};
use dustproof_store::{IntentStore, SignatureStore, StoreError, VerifiedStore};
use dustproof_store_json::JsonStores;
use dustproof_types::{Clock, RandomSource, SystemClock, ThreadRandom, WalletAddress};
use dustproof_utils::format_duration;
use dustproof_verification::{
    AmountAllocator, ExpirySweeper, Issuer, Reconciler, TickOutcome, VerifiedEventBus,
    VerifierMetrics,
};
use dustproof_websocket::{Notifier, WebSocketServer};

use crate::{stopped, NodeError, ServiceConfig, ShutdownController};

/// How long `stop` waits for background tasks before abandoning them.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// The three collections, cloned into blocking tasks for snapshot writes.
#[derive(Clone)]
struct StoreSet {
    intents: Arc<dyn IntentStore>,
    verified: Arc<dyn VerifiedStore>,
    signatures: Arc<dyn SignatureStore>,
}

impl StoreSet {
    /// Rewrite every dirty collection. Blocks on fsync.
    fn flush(&self, metrics: &VerifierMetrics) -> Result<(), StoreError> {
        let mut result = Ok(());
        for (name, flushed) in [
            ("pending", self.intents.flush()),
            ("verified", self.verified.flush()),
            ("consumed", self.signatures.flush()),
        ] {
            if let Err(e) = flushed {
                metrics.store_write_failures.inc();
                tracing::warn!(collection = name, error = %e, "store not persisted");
                result = Err(e);
            }
        }
        result
    }
}

pub struct VerifierNode<C = SolanaRpcClient> {
    config: ServiceConfig,
    stores: StoreSet,
    metrics: Arc<VerifierMetrics>,
    notifier: Arc<Notifier>,
    issuer: Arc<Issuer>,
    sweeper: ExpirySweeper,
    reconciler: Arc<Reconciler<C>>,
    shutdown: ShutdownController,
    task_handles: Vec<JoinHandle<()>>,
    http_addr: Option<SocketAddr>,
    websocket_addr: Option<SocketAddr>,
}

impl VerifierNode<SolanaRpcClient> {
    /// Build a node against the configured Solana endpoint.
    pub fn new(config: ServiceConfig) -> Result<Self, NodeError> {
        let chain = SolanaRpcClient::new(config.rpc_url.clone(), config.rpc_retry_policy())?;
        Self::with_chain(config, chain, Arc::new(SystemClock), Arc::new(ThreadRandom))
    }
}

impl<C: ChainSource + 'static> VerifierNode<C> {
    /// Build a node on an arbitrary chain source, clock and random source.
    pub fn with_chain(
        config: ServiceConfig,
        chain: C,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
    ) -> Result<Self, NodeError> {
        config.validate()?;

        let JsonStores {
            intents,
            verified,
            signatures,
        } = JsonStores::open(&config.data_dir, config.consumed_capacity)?;
        let intents: Arc<dyn IntentStore> = Arc::new(intents);
        let verified: Arc<dyn VerifiedStore> = Arc::new(verified);
        let signatures: Arc<dyn SignatureStore> = Arc::new(signatures);

        let metrics = Arc::new(VerifierMetrics::new());
        let notifier = Arc::new(Notifier::new(config.notifier_capacity));
        let receiving = WalletAddress::new(config.receiving_address.clone());

        let sweeper = ExpirySweeper::new(intents.clone(), clock.clone(), metrics.clone());
        let allocator = AmountAllocator::new(
            config.min_amount_lamports,
            config.max_amount_lamports,
            config.avoid_amount_collisions,
            config.max_allocation_attempts,
            random.clone(),
        )?;
        let issuer = Arc::new(Issuer::new(
            intents.clone(),
            allocator,
            sweeper.clone(),
            clock.clone(),
            random,
            metrics.clone(),
            receiving.clone(),
            config.intent_ttl(),
        ));

        let mut bus = VerifiedEventBus::new();
        let push = Arc::clone(&notifier);
        bus.subscribe(move |event| {
            push.publish(event);
        });

        let reconciler = Arc::new(Reconciler::new(
            ChainPoller::new(chain, receiving, config.signature_limit),
            intents.clone(),
            verified.clone(),
            signatures.clone(),
            bus,
            clock,
            config.collision_policy,
            metrics.clone(),
        ));

        Ok(Self {
            config,
            stores: StoreSet {
                intents,
                verified,
                signatures,
            },
            metrics,
            notifier,
            issuer,
            sweeper,
            reconciler,
            shutdown: ShutdownController::new(),
            task_handles: Vec::new(),
            http_addr: None,
            websocket_addr: None,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn issuer(&self) -> &Arc<Issuer> {
        &self.issuer
    }

    pub fn reconciler(&self) -> &Arc<Reconciler<C>> {
        &self.reconciler
    }

    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    pub fn metrics(&self) -> &Arc<VerifierMetrics> {
        &self.metrics
    }

    pub fn intents(&self) -> &Arc<dyn IntentStore> {
        &self.stores.intents
    }

    pub fn verified(&self) -> &Arc<dyn VerifiedStore> {
        &self.stores.verified
    }

    /// Bound HTTP address, once started.
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.http_addr
    }

    /// Bound WebSocket address, once started.
    pub fn websocket_addr(&self) -> Option<SocketAddr> {
        self.websocket_addr
    }

    /// Repair the stores, bind both servers, and spawn every background task.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        tracing::info!(
            receiving = %self.config.receiving_address,
            data_dir = %self.config.data_dir.display(),
            poll = %format_duration(self.config.poll_interval()),
            policy = ?self.config.collision_policy,
            "verifier node starting"
        );

        let reconciler = Arc::clone(&self.reconciler);
        let sweeper = self.sweeper.clone();
        tokio::task::spawn_blocking(move || {
            match reconciler.repair() {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "startup repair complete"),
                Err(e) => tracing::error!(error = %e, "startup repair failed"),
            }
            if let Err(e) = sweeper.sweep() {
                tracing::warn!(error = %e, "startup sweep failed");
            }
        })
        .await?;
        tracing::info!(
            pending = self.stores.intents.len(),
            verified = self.stores.verified.len(),
            consumed = self.stores.signatures.len(),
            "stores loaded"
        );

        // Bind first so a port conflict fails startup instead of a task.
        let http_listener = TcpListener::bind(("0.0.0.0", self.config.http_port))
            .await
            .map_err(|e| NodeError::Rpc(format!("bind port {}: {e}", self.config.http_port)))?;
        let ws_listener = TcpListener::bind(("0.0.0.0", self.config.websocket_port))
            .await
            .map_err(|e| {
                NodeError::WebSocket(format!("bind port {}: {e}", self.config.websocket_port))
            })?;
        self.http_addr = Some(http_listener.local_addr()?);
        self.websocket_addr = Some(ws_listener.local_addr()?);

        self.spawn_reconcile_loop();
        self.spawn_sweep_loop();
        self.spawn_http(http_listener);
        self.spawn_websocket(ws_listener);

        tracing::info!(
            http = ?self.http_addr,
            websocket = ?self.websocket_addr,
            "verifier node started"
        );
        Ok(())
    }

    /// Start, wait for SIGINT/SIGTERM, then stop.
    pub async fn run(&mut self) -> Result<(), NodeError> {
        self.start().await?;
        self.shutdown.wait_for_signal().await;
        self.stop().await
    }

    /// Signal every task, wait for them, and flush the stores.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        tracing::info!("verifier node stopping");
        self.shutdown.shutdown();

        for handle in self.task_handles.drain(..) {
            match tokio::time::timeout(STOP_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "task ended abnormally"),
                Err(_) => tracing::warn!("task did not stop in time"),
            }
        }

        let stores = self.stores.clone();
        let metrics = Arc::clone(&self.metrics);
        let flushed = tokio::task::spawn_blocking(move || stores.flush(&metrics)).await?;
        if let Err(e) = &flushed {
            tracing::error!(error = %e, "final flush failed");
        }
        tracing::info!("verifier node stopped");
        Ok(flushed?)
    }

    fn spawn_reconcile_loop(&mut self) {
        let reconciler = Arc::clone(&self.reconciler);
        let period = self.config.poll_interval();
        let mut shutdown_rx = self.shutdown.subscribe();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = stopped(&mut shutdown_rx) => {
                        tracing::info!("reconcile loop shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        match reconciler.tick().await {
                            Ok(TickOutcome::Completed(_)) => {}
                            Ok(TickOutcome::Skipped) => tracing::debug!("reconcile tick skipped"),
                            // Already logged by the reconciler; the next tick retries.
                            Err(_) => {}
                        }
                    }
                }
            }
        });
        self.task_handles.push(handle);
    }

    /// Sweeps expired intents and retries store writes that failed earlier.
    fn spawn_sweep_loop(&mut self) {
        let sweeper = self.sweeper.clone();
        let stores = self.stores.clone();
        let metrics = Arc::clone(&self.metrics);
        let period = self.config.sweep_interval();
        let mut shutdown_rx = self.shutdown.subscribe();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval.tick().await; // startup already swept
            loop {
                tokio::select! {
                    biased;
                    _ = stopped(&mut shutdown_rx) => {
                        tracing::info!("sweep loop shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let sweeper = sweeper.clone();
                        let stores = stores.clone();
                        let metrics = Arc::clone(&metrics);
                        let swept = tokio::task::spawn_blocking(move || {
                            if let Err(e) = sweeper.sweep() {
                                tracing::warn!(error = %e, "expiry sweep failed");
                            }
                            // Failures are logged and counted; the next sweep retries.
                            let _ = stores.flush(&metrics);
                        })
                        .await;
                        if let Err(e) = swept {
                            tracing::error!(error = %e, "sweep task failed");
                        }
                    }
                }
            }
        });
        self.task_handles.push(handle);
    }

    fn spawn_http(&mut self, listener: TcpListener) {
        let server = RpcServer::new(
            self.config.http_port,
            Arc::new(RpcState {
                issuer: Arc::clone(&self.issuer),
                display_address: WalletAddress::new(self.config.display_address()),
                metrics: Arc::clone(&self.metrics),
            }),
        );
        let shutdown = self.shutdown.signalled();
        let handle = tokio::spawn(async move {
            match server.serve(listener, shutdown).await {
                Ok(()) => tracing::info!("HTTP server exited"),
                Err(e) => tracing::error!(error = %e, "HTTP server error"),
            }
        });
        self.task_handles.push(handle);
    }

    fn spawn_websocket(&mut self, listener: TcpListener) {
        let server = WebSocketServer::new(self.config.websocket_port, Arc::clone(&self.notifier));
        let shutdown = self.shutdown.signalled();
        let handle = tokio::spawn(async move {
            match server.serve(listener, shutdown).await {
                Ok(()) => tracing::info!("WebSocket server exited"),
                Err(e) => tracing::error!(error = %e, "WebSocket server error"),
            }
        });
        self.task_handles.push(handle);
    }
}
