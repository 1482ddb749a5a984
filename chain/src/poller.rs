//! One poll tick against the receiving address.

use std::collections::HashSet;

use dustproof_types::{Timestamp, TransferObservation, TxSignature, WalletAddress};

use crate::{ChainError, ChainSource, ParsedTransaction};

/// Default number of recent signatures fetched per tick.
pub const DEFAULT_SIGNATURE_LIMIT: usize = 10;

/// A signature whose transaction was examined this tick, with every transfer
/// to the receiving address found in it (possibly none).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExaminedSignature {
    pub signature: TxSignature,
    pub observations: Vec<TransferObservation>,
}

/// Fetches recent transfers to a fixed receiving address.
pub struct ChainPoller<C> {
    source: C,
    receiving_address: WalletAddress,
    signature_limit: usize,
}

impl<C: ChainSource> ChainPoller<C> {
    pub fn new(source: C, receiving_address: WalletAddress, signature_limit: usize) -> Self {
        Self {
            source,
            receiving_address,
            signature_limit: signature_limit.max(1),
        }
    }

    pub fn receiving_address(&self) -> &WalletAddress {
        &self.receiving_address
    }

    pub fn source(&self) -> &C {
        &self.source
    }

    /// Fetch the latest signatures and examine each one not yet consumed,
    /// oldest first.
    ///
    /// An unreachable endpoint aborts the whole tick with nothing examined,
    /// so the caller's consumed set is left untouched. A signature whose
    /// detail lookup is answered with an RPC error or an undecodable payload
    /// is left out of this tick only; the rest of the listing is still
    /// examined. A signature whose transaction is not yet visible at
    /// `confirmed` commitment is likewise left for a later tick. Failed
    /// transactions are examined and yield no observations.
    pub async fn poll<F>(&self, is_consumed: F, now: Timestamp) -> Result<Vec<ExaminedSignature>, ChainError>
    where
        F: Fn(&TxSignature) -> bool + Send + Sync,
    {
        let mut infos = self
            .source
            .recent_signatures(&self.receiving_address, self.signature_limit)
            .await?;
        infos.reverse();

        let mut seen = HashSet::new();
        let mut examined = Vec::new();
        for info in infos {
            if is_consumed(&info.signature) || !seen.insert(info.signature.clone()) {
                continue;
            }
            if info.failed {
                tracing::debug!(signature = %info.signature, "failed transaction, no transfers");
                examined.push(ExaminedSignature {
                    signature: info.signature,
                    observations: Vec::new(),
                });
                continue;
            }
            match self.source.transaction(&info.signature).await {
                Ok(Some(tx)) => examined.push(ExaminedSignature {
                    observations: self.observations(&tx, now),
                    signature: info.signature,
                }),
                Ok(None) => {
                    tracing::debug!(signature = %info.signature, "not yet confirmed, retrying next tick");
                }
                Err(e) if e.is_unavailable() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        signature = %info.signature,
                        error = %e,
                        "transaction detail unusable, skipping it this tick"
                    );
                }
            }
        }
        Ok(examined)
    }

    /// Transfers in `tx` whose destination is the receiving address.
    pub fn observations(&self, tx: &ParsedTransaction, now: Timestamp) -> Vec<TransferObservation> {
        if tx.failed {
            return Vec::new();
        }
        tx.transfers
            .iter()
            .filter(|t| t.destination == self.receiving_address)
            .map(|t| TransferObservation {
                signature: tx.signature.clone(),
                source: t.source.clone(),
                destination: t.destination.clone(),
                lamports: t.lamports,
                observed_at: now,
                block_time: tx.block_time,
            })
            .collect()
    }
}
