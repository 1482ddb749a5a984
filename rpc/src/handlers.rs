//! Request handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use dustproof_verification::{IntentRequest, PaymentInstructions};

use crate::{ApiError, RpcState};

/// Fixed liveness message.
pub const STATUS_MESSAGE: &str = "Listener is running and monitoring transactions.";

#[derive(Debug, Serialize, Deserialize)]
pub struct AddressResponse {
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub message: String,
}

pub async fn payment_request(
    State(state): State<Arc<RpcState>>,
    body: Result<Json<IntentRequest>, JsonRejection>,
) -> Result<Json<PaymentInstructions>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let issuer = Arc::clone(&state.issuer);
    // Issuance writes the pending collection through to disk.
    let instructions = tokio::task::spawn_blocking(move || issuer.create_intent(&request))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(Json(instructions))
}

pub async fn address(State(state): State<Arc<RpcState>>) -> Json<AddressResponse> {
    Json(AddressResponse {
        address: state.display_address.to_string(),
    })
}

pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: STATUS_MESSAGE.to_string(),
    })
}

pub async fn metrics(State(state): State<Arc<RpcState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.encode(),
    )
}
