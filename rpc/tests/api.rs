//! HTTP API through the router, without a socket.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use dustproof_nullables::{NullClock, NullIntentStore, NullRandom};
use dustproof_rpc::{router, RpcState};
use dustproof_store::IntentStore;
use dustproof_types::WalletAddress;
use dustproof_verification::{
    AmountAllocator, ExpirySweeper, Issuer, VerifierMetrics, DEFAULT_INTENT_TTL,
};

const RECEIVER: &str = "Recv1111111111111111111111111111";
const VANITY: &str = "DUSTvanity111111111111111111111111";
const WALLET: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

fn app() -> (Router, Arc<NullIntentStore>) {
    let intents = Arc::new(NullIntentStore::new());
    let clock = Arc::new(NullClock::new(1_000));
    let random = Arc::new(NullRandom::constant(4210));
    let metrics = Arc::new(VerifierMetrics::new());
    let issuer = Issuer::new(
        intents.clone(),
        AmountAllocator::with_defaults(random.clone()),
        ExpirySweeper::new(intents.clone(), clock.clone(), metrics.clone()),
        clock,
        random,
        metrics.clone(),
        WalletAddress::new(RECEIVER),
        DEFAULT_INTENT_TTL,
    );
    let state = Arc::new(RpcState {
        issuer: Arc::new(issuer),
        display_address: WalletAddress::new(VANITY),
        metrics,
    });
    (router(state), intents)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn post_json(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/payment-request")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn payment_request_returns_only_public_fields() {
    let (app, intents) = app();
    let (status, body) = send(
        app,
        post_json(json!({
            "discordId": "123456789012345678",
            "twitterHandle": "@alice",
            "walletAddress": WALLET
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["amount"], "0.000004210");
    assert_eq!(json["receivingAddress"], RECEIVER);
    assert_eq!(json["expiresAt"], 1_000 + 15 * 60 * 1000);
    assert_eq!(json.as_object().unwrap().len(), 3, "no internal id leaks: {json}");
    assert_eq!(intents.len(), 1);
}

#[tokio::test]
async fn missing_field_is_bad_request() {
    let (app, intents) = app();
    let (status, body) = send(app, post_json(json!({ "walletAddress": WALLET }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("discordId"));
    assert!(intents.is_empty());
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let (app, _) = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/payment-request")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn store_failure_is_internal_error() {
    let (app, intents) = app();
    intents.fail_inserts(true);
    let (status, _) = send(
        app,
        post_json(json!({ "discordId": "123456789012345678", "walletAddress": WALLET })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn address_returns_display_alias() {
    let (app, _) = app();
    let (status, body) = send(app, get("/api/address")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["address"], VANITY);
}

#[tokio::test]
async fn status_is_static() {
    let (app, _) = app();
    let (status, body) = send(app, get("/status")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["message"], "Listener is running and monitoring transactions.");
}

#[tokio::test]
async fn metrics_reflect_issued_intents() {
    let (app, _) = app();
    send(
        app.clone(),
        post_json(json!({ "discordId": "123456789012345678", "walletAddress": WALLET })),
    )
    .await;
    let (status, body) = send(app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("dustproof_intents_created_total 1"), "{text}");
}

#[tokio::test]
async fn cors_preflight_is_allowed() {
    let (app, _) = app();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/payment-request")
        .header(header::ORIGIN, "https://example.org")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response.status().is_success());
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}
