//! HTTP API of the verifier.
//!
//! Provides endpoints for:
//! - `POST /payment-request`: issue a payment intent
//! - `GET /api/address`: the human-facing receiving address
//! - `GET /status`: liveness
//! - `GET /metrics`: Prometheus text exposition

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{router, RpcServer, RpcState};
