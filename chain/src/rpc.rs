//! Solana JSON-RPC client over HTTP.
//!
//! Wraps `reqwest::Client` with the endpoint URL and a bounded retry policy.
//! Every request is made at `confirmed` commitment so that observations are
//! not later dropped by a fork.

use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dustproof_types::{TxSignature, WalletAddress};
use dustproof_utils::{retry, RetryPolicy};

use crate::decode::{decode_signatures, decode_transaction};
use crate::{ChainError, ChainSource, ParsedTransaction, SignatureInfo};

/// Default timeout for a single RPC request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Commitment level for every query.
const COMMITMENT: &str = "confirmed";

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// JSON-RPC client for a Solana-compatible endpoint.
pub struct SolanaRpcClient {
    http: reqwest::Client,
    url: String,
    retry: RetryPolicy,
    next_id: AtomicU64,
}

impl SolanaRpcClient {
    /// Create a client for `url` with the given retry policy.
    pub fn new(url: impl Into<String>, retry: RetryPolicy) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ChainError::Unavailable(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
            retry,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue `method` with `params`, retrying per the client's policy.
    async fn call(&self, method: &'static str, params: Value) -> Result<Value, ChainError> {
        retry(&self.retry, method, || self.call_once(method, params.clone())).await
    }

    async fn call_once(&self, method: &'static str, params: Value) -> Result<Value, ChainError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChainError::Unavailable(format!("{method} timed out: {e}"))
                } else if e.is_connect() {
                    ChainError::Unavailable(format!("{method} connection failed: {e}"))
                } else {
                    ChainError::Unavailable(format!("{method}: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChainError::Unavailable(format!("{method} returned HTTP {status}")));
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(format!("{method}: {e}")))?;

        if let Some(err) = parsed.error {
            return Err(ChainError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(parsed.result.unwrap_or(Value::Null))
    }
}

impl ChainSource for SolanaRpcClient {
    async fn recent_signatures(
        &self,
        address: &WalletAddress,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, ChainError> {
        let result = self
            .call(
                "getSignaturesForAddress",
                json!([address.as_str(), { "limit": limit, "commitment": COMMITMENT }]),
            )
            .await?;
        decode_signatures(result)
    }

    async fn transaction(
        &self,
        signature: &TxSignature,
    ) -> Result<Option<ParsedTransaction>, ChainError> {
        let result = self
            .call(
                "getTransaction",
                json!([
                    signature.as_str(),
                    {
                        "encoding": "jsonParsed",
                        "commitment": COMMITMENT,
                        "maxSupportedTransactionVersion": 0
                    }
                ]),
            )
            .await?;
        decode_transaction(signature, result)
    }
}
