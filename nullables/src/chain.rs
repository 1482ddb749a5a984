//! Nullable chain: scripted transfers, no network.

use dustproof_chain::{ChainError, ChainSource, ParsedTransaction, SignatureInfo, SystemTransfer};
use dustproof_types::{Lamports, TxSignature, WalletAddress};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct ChainState {
    /// Oldest first; listings are served newest first.
    transactions: Vec<ParsedTransaction>,
    /// Signatures listed but not yet visible at `confirmed`.
    unconfirmed: Vec<TxSignature>,
    /// Extra copies of signatures the listing should repeat.
    duplicates: Vec<TxSignature>,
    /// Listed signatures whose detail comes back undecodable.
    rejected: Vec<TxSignature>,
}

/// An in-memory chain for testing.
///
/// Clones share state, so a test can keep a handle and keep feeding
/// transfers after handing a clone to the poller.
#[derive(Clone, Default)]
pub struct NullChain {
    state: Arc<Mutex<ChainState>>,
    unavailable: Arc<AtomicBool>,
    signature_calls: Arc<AtomicUsize>,
    transaction_calls: Arc<AtomicUsize>,
}

impl NullChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a confirmed transaction with a single system transfer.
    pub fn push_transfer(
        &self,
        signature: &str,
        source: &str,
        destination: &str,
        lamports: u64,
    ) -> TxSignature {
        self.push_transaction(ParsedTransaction {
            signature: TxSignature::new(signature),
            slot: 0,
            block_time: None,
            failed: false,
            transfers: vec![SystemTransfer {
                source: WalletAddress::new(source),
                destination: WalletAddress::new(destination),
                lamports: Lamports::new(lamports),
            }],
        })
    }

    /// Record an arbitrary transaction.
    pub fn push_transaction(&self, mut tx: ParsedTransaction) -> TxSignature {
        let mut state = self.state.lock().unwrap();
        tx.slot = state.transactions.len() as u64 + 1;
        let signature = tx.signature.clone();
        state.transactions.push(tx);
        signature
    }

    /// List `signature` without making its detail available yet.
    pub fn push_unconfirmed(&self, signature: &str) {
        self.state
            .lock()
            .unwrap()
            .unconfirmed
            .push(TxSignature::new(signature));
    }

    /// Make a previously unconfirmed signature's transaction visible.
    pub fn confirm(&self, tx: ParsedTransaction) {
        let mut state = self.state.lock().unwrap();
        state.unconfirmed.retain(|s| s != &tx.signature);
        drop(state);
        self.push_transaction(tx);
    }

    /// Make the listing return `signature` twice.
    pub fn duplicate_in_listing(&self, signature: &TxSignature) {
        self.state
            .lock()
            .unwrap()
            .duplicates
            .push(signature.clone());
    }

    /// Make detail lookups for `signature` fail with
    /// [`ChainError::InvalidResponse`] while it stays in the listing.
    pub fn reject_transaction(&self, signature: &TxSignature) {
        self.state
            .lock()
            .unwrap()
            .rejected
            .push(signature.clone());
    }

    /// Make every call fail with [`ChainError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of signature listings served.
    pub fn signature_calls(&self) -> usize {
        self.signature_calls.load(Ordering::SeqCst)
    }

    /// Number of transaction detail lookups served.
    pub fn transaction_calls(&self) -> usize {
        self.transaction_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), ChainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(ChainError::Unavailable("null chain is offline".into()))
        } else {
            Ok(())
        }
    }
}

impl ChainSource for NullChain {
    async fn recent_signatures(
        &self,
        address: &WalletAddress,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, ChainError> {
        self.signature_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let state = self.state.lock().unwrap();
        let mut listing: Vec<SignatureInfo> = Vec::new();
        for signature in &state.unconfirmed {
            listing.push(SignatureInfo {
                signature: signature.clone(),
                slot: u64::MAX,
                failed: false,
            });
        }
        for tx in state.transactions.iter().rev() {
            let involved = tx
                .transfers
                .iter()
                .any(|t| &t.destination == address || &t.source == address);
            if !involved {
                continue;
            }
            let info = SignatureInfo {
                signature: tx.signature.clone(),
                slot: tx.slot,
                failed: tx.failed,
            };
            if state.duplicates.contains(&tx.signature) {
                listing.push(info.clone());
            }
            listing.push(info);
        }
        listing.truncate(limit);
        Ok(listing)
    }

    async fn transaction(
        &self,
        signature: &TxSignature,
    ) -> Result<Option<ParsedTransaction>, ChainError> {
        self.transaction_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let state = self.state.lock().unwrap();
        if state.rejected.contains(signature) {
            return Err(ChainError::InvalidResponse(format!(
                "transaction {signature}: unexpected payload shape"
            )));
        }
        Ok(state
            .transactions
            .iter()
            .find(|tx| &tx.signature == signature)
            .cloned())
    }
}
