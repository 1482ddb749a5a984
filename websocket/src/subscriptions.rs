//! Subscriber control messages and the per-connection wallet filter.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use dustproof_types::{VerifiedEvent, WalletAddress};

/// Messages a subscriber may send.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Narrow delivery to events for these wallets. An empty list restores
    /// delivery of every event.
    Subscribe {
        #[serde(default)]
        wallets: Vec<String>,
    },
    Ping,
}

/// Control messages the server sends. Events themselves go out bare.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Ack { action: String, wallets: usize },
    Pong,
    Error { message: String },
}

/// Which events a connection receives. Default: all of them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscriptionFilter {
    wallets: Option<HashSet<WalletAddress>>,
}

impl SubscriptionFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn wallets<I, S>(wallets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: HashSet<WalletAddress> = wallets
            .into_iter()
            .map(|w| WalletAddress::new(w.into()))
            .collect();
        Self {
            wallets: (!set.is_empty()).then_some(set),
        }
    }

    /// Number of wallets filtered on, zero when unfiltered.
    pub fn len(&self) -> usize {
        self.wallets.as_ref().map_or(0, HashSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn matches(&self, event: &VerifiedEvent) -> bool {
        self.wallets
            .as_ref()
            .map_or(true, |set| set.contains(&event.identity.wallet_address))
    }
}
