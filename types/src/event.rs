//! The verified-identity event pushed to subscribers.

use serde::{Deserialize, Serialize};

use crate::{Identity, Lamports, Timestamp, TxSignature, VerifiedRecord};

/// Status tag of a pushed event. Only confirmations are ever pushed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Confirmed,
}

/// `{status: "confirmed", discordId, walletAddress, amount, verifiedAt, signature}`.
///
/// `txId` repeats the signature under the name older bot builds read, and
/// `seq` is stamped by the notifier so subscribers can detect gaps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedEvent {
    pub status: EventStatus,
    #[serde(flatten)]
    pub identity: Identity,
    pub amount: Lamports,
    pub verified_at: Timestamp,
    pub signature: TxSignature,
    pub tx_id: TxSignature,
    #[serde(default)]
    pub seq: u64,
}

impl VerifiedEvent {
    pub fn from_record(record: &VerifiedRecord) -> Self {
        Self {
            status: EventStatus::Confirmed,
            identity: record.intent.identity.clone(),
            amount: record.intent.amount,
            verified_at: record.verified_at,
            signature: record.signature.clone(),
            tx_id: record.signature.clone(),
            seq: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IntentId, IntentState, PaymentIntent, WalletAddress};

    #[test]
    fn event_shape_matches_subscriber_contract() {
        let intent = PaymentIntent {
            id: IntentId::new("internal"),
            identity: Identity {
                wallet_address: WalletAddress::new("W1"),
                external_id: "U1".into(),
                secondary_handle: None,
            },
            amount: Lamports::new(4210),
            receiving_address: None,
            created_at: Timestamp::new(0),
            expires_at: Timestamp::new(10),
            state: IntentState::Pending,
        };
        let record = intent.to_verified(TxSignature::new("5ig"), Timestamp::new(7));
        let json = serde_json::to_value(VerifiedEvent::from_record(&record)).unwrap();

        assert_eq!(json["status"], "confirmed");
        assert_eq!(json["discordId"], "U1");
        assert_eq!(json["walletAddress"], "W1");
        assert_eq!(json["amount"], "0.000004210");
        assert_eq!(json["verifiedAt"], 7);
        assert_eq!(json["signature"], "5ig");
        assert_eq!(json["txId"], "5ig");
        // The correlation id stays internal.
        assert!(json.get("id").is_none());
    }
}
