//! The chain seam.

use std::future::Future;

use dustproof_types::{Lamports, Timestamp, TxSignature, WalletAddress};

use crate::ChainError;

/// One entry of a signatures-for-address listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureInfo {
    pub signature: TxSignature,
    pub slot: u64,
    /// The transaction executed but failed.
    pub failed: bool,
}

/// A native-currency transfer instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemTransfer {
    pub source: WalletAddress,
    pub destination: WalletAddress,
    pub lamports: Lamports,
}

/// The parts of a confirmed transaction the poller cares about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedTransaction {
    pub signature: TxSignature,
    pub slot: u64,
    pub block_time: Option<Timestamp>,
    pub failed: bool,
    /// Top-level system-program transfers, in instruction order.
    pub transfers: Vec<SystemTransfer>,
}

/// Read access to a chain at `confirmed` commitment.
pub trait ChainSource: Send + Sync {
    /// The most recent signatures involving `address`, newest first.
    fn recent_signatures(
        &self,
        address: &WalletAddress,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<SignatureInfo>, ChainError>> + Send;

    /// Full detail for one signature, or `None` if it is not (yet) visible at
    /// `confirmed` commitment.
    fn transaction(
        &self,
        signature: &TxSignature,
    ) -> impl Future<Output = Result<Option<ParsedTransaction>, ChainError>> + Send;
}
