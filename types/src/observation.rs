//! Decoded incoming transfers.

use crate::{Lamports, Timestamp, TxSignature, WalletAddress};

/// A native-currency transfer extracted from chain data during a poll tick.
///
/// Ephemeral: consumed once by the reconciler, after which only its
/// signature is remembered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferObservation {
    pub signature: TxSignature,
    pub source: WalletAddress,
    pub destination: WalletAddress,
    pub lamports: Lamports,
    pub observed_at: Timestamp,
    /// Block time reported by the chain, when available.
    pub block_time: Option<Timestamp>,
}
