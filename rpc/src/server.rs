//! Axum-based HTTP server.

use std::future::Future;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use dustproof_types::WalletAddress;
use dustproof_verification::{Issuer, VerifierMetrics};

use crate::{handlers, ApiError};

/// Shared state of every handler.
pub struct RpcState {
    pub issuer: Arc<Issuer>,
    /// Address shown to users. Informational only, never used in matching.
    pub display_address: WalletAddress,
    pub metrics: Arc<VerifierMetrics>,
}

pub fn router(state: Arc<RpcState>) -> Router {
    Router::new()
        .route("/payment-request", post(handlers::payment_request))
        .route("/api/address", get(handlers::address))
        .route("/status", get(handlers::status))
        .route("/metrics", get(handlers::metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub struct RpcServer {
    pub port: u16,
    pub state: Arc<RpcState>,
}

impl RpcServer {
    pub fn new(port: u16, state: Arc<RpcState>) -> Self {
        Self { port, state }
    }

    /// Bind `0.0.0.0:port` and serve until `shutdown` completes.
    pub async fn start<F>(&self, shutdown: F) -> Result<(), ApiError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ApiError::Server(format!("failed to bind {addr}: {e}")))?;
        tracing::info!(%addr, "HTTP API listening");
        self.serve(listener, shutdown).await
    }

    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), ApiError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, router(Arc::clone(&self.state)))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ApiError::Server(e.to_string()))
    }
}
