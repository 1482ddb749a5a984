//! Decoding of `jsonParsed` RPC payloads.
//!
//! Only top-level instructions whose `program` is `system` and whose parsed
//! `type` is `transfer` are decoded; every other instruction is skipped
//! without error. A malformed transfer instruction is skipped with a
//! warning rather than failing the whole transaction.

use serde::Deserialize;
use serde_json::Value;

use dustproof_types::{Lamports, Timestamp, TxSignature, WalletAddress};

use crate::{ChainError, ParsedTransaction, SignatureInfo, SystemTransfer};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcSignatureInfo {
    signature: String,
    #[serde(default)]
    slot: u64,
    #[serde(default)]
    err: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransaction {
    #[serde(default)]
    slot: u64,
    #[serde(default)]
    block_time: Option<i64>,
    #[serde(default)]
    meta: Option<RpcMeta>,
    transaction: RpcTransactionBody,
}

#[derive(Deserialize)]
struct RpcMeta {
    #[serde(default)]
    err: Option<Value>,
}

#[derive(Deserialize)]
struct RpcTransactionBody {
    message: RpcMessage,
}

#[derive(Deserialize)]
struct RpcMessage {
    #[serde(default)]
    instructions: Vec<Value>,
}

#[derive(Deserialize)]
struct TransferInfo {
    source: String,
    destination: String,
    lamports: u64,
}

/// Decode a `getSignaturesForAddress` result.
pub fn decode_signatures(result: Value) -> Result<Vec<SignatureInfo>, ChainError> {
    let raw: Vec<RpcSignatureInfo> = serde_json::from_value(result)
        .map_err(|e| ChainError::InvalidResponse(format!("signature list: {e}")))?;
    Ok(raw
        .into_iter()
        .map(|r| SignatureInfo {
            signature: TxSignature::new(r.signature),
            slot: r.slot,
            failed: r.err.is_some_and(|e| !e.is_null()),
        })
        .collect())
}

/// Decode a `getTransaction` result. A JSON `null` means the transaction is
/// not visible at the requested commitment yet.
pub fn decode_transaction(
    signature: &TxSignature,
    result: Value,
) -> Result<Option<ParsedTransaction>, ChainError> {
    if result.is_null() {
        return Ok(None);
    }
    let raw: RpcTransaction = serde_json::from_value(result)
        .map_err(|e| ChainError::InvalidResponse(format!("transaction {signature}: {e}")))?;

    let failed = raw
        .meta
        .and_then(|m| m.err)
        .is_some_and(|e| !e.is_null());
    let block_time = raw
        .block_time
        .and_then(|secs| u64::try_from(secs).ok())
        .map(Timestamp::from_secs);
    let transfers = raw
        .transaction
        .message
        .instructions
        .iter()
        .filter_map(|ix| decode_transfer(signature, ix))
        .collect();

    Ok(Some(ParsedTransaction {
        signature: signature.clone(),
        slot: raw.slot,
        block_time,
        failed,
        transfers,
    }))
}

fn decode_transfer(signature: &TxSignature, ix: &Value) -> Option<SystemTransfer> {
    if ix.get("program").and_then(Value::as_str) != Some("system") {
        return None;
    }
    let parsed = ix.get("parsed")?;
    if parsed.get("type").and_then(Value::as_str) != Some("transfer") {
        return None;
    }
    let info = parsed.get("info")?.clone();
    match serde_json::from_value::<TransferInfo>(info) {
        Ok(info) => Some(SystemTransfer {
            source: WalletAddress::new(info.source),
            destination: WalletAddress::new(info.destination),
            lamports: Lamports::new(info.lamports),
        }),
        Err(e) => {
            tracing::warn!(%signature, error = %e, "skipping malformed transfer instruction");
            None
        }
    }
}
