//! Payment intents and the verified records they become.
//!
//! Field names on the wire and on disk follow the camelCase layout of the
//! collections consumed by the role-sync bot (`discordId`, `walletAddress`,
//! `expiresAt`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Lamports, Timestamp, TxSignature, ValidationError, WalletAddress};

/// Opaque correlation token of an intent. Internal only: the caller is
/// matched by amount, never by id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentId(String);

impl IntentId {
    /// Build an id from 16 random bytes, hex encoded.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(hex::encode(bytes))
    }

    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The off-chain identity that wants to be bound to a wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "walletAddress")]
    pub wallet_address: WalletAddress,
    /// Chat-platform account id (a Discord snowflake).
    #[serde(rename = "discordId")]
    pub external_id: String,
    #[serde(rename = "twitterHandle", default, skip_serializing_if = "Option::is_none")]
    pub secondary_handle: Option<String>,
}

impl Identity {
    /// Validate raw request fields into an identity.
    ///
    /// `externalId` must be 17-20 ASCII digits, the wallet must be base58, and
    /// the optional handle (leading `@` stripped) must be 1-15 of
    /// `[A-Za-z0-9_]`. A blank handle counts as absent.
    pub fn parse(
        external_id: Option<&str>,
        wallet_address: Option<&str>,
        secondary_handle: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let external_id = external_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ValidationError::MissingField("discordId"))?;
        if !(17..=20).contains(&external_id.len())
            || !external_id.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(ValidationError::InvalidField {
                field: "discordId",
                reason: "must be a 17-20 digit account id".into(),
            });
        }

        let wallet_address = wallet_address
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ValidationError::MissingField("walletAddress"))?;
        let wallet_address = WalletAddress::parse(wallet_address)?;

        let secondary_handle = match secondary_handle.map(str::trim) {
            None | Some("") => None,
            Some(handle) => {
                let handle = handle.strip_prefix('@').unwrap_or(handle);
                let valid = (1..=15).contains(&handle.len())
                    && handle
                        .bytes()
                        .all(|b| b.is_ascii_alphanumeric() || b == b'_');
                if !valid {
                    return Err(ValidationError::InvalidField {
                        field: "twitterHandle",
                        reason: "letters, digits and underscores only, at most 15".into(),
                    });
                }
                Some(handle.to_string())
            }
        };

        Ok(Self {
            wallet_address,
            external_id: external_id.to_string(),
            secondary_handle,
        })
    }
}

/// Lifecycle state of an intent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentState {
    #[default]
    Pending,
    Verified,
    Expired,
}

/// A not-yet-confirmed request to prove ownership of `identity.wallet_address`
/// by transferring exactly `amount`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    #[serde(alias = "token")]
    pub id: IntentId,
    #[serde(flatten)]
    pub identity: Identity,
    pub amount: Lamports,
    /// Destination the intent was issued for. Intents written before this
    /// field existed carry none and match any destination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiving_address: Option<WalletAddress>,
    #[serde(default)]
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    #[serde(default)]
    pub state: IntentState,
}

impl PaymentIntent {
    /// Whether the intent can no longer be verified at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }

    /// Copy this intent into a verified record.
    pub fn to_verified(&self, signature: TxSignature, verified_at: Timestamp) -> VerifiedRecord {
        let mut intent = self.clone();
        intent.state = IntentState::Verified;
        VerifiedRecord {
            intent,
            verified_at,
            signature,
        }
    }
}

/// An append-only binding of identity to wallet, proven by `signature`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedRecord {
    #[serde(flatten)]
    pub intent: PaymentIntent,
    pub verified_at: Timestamp,
    pub signature: TxSignature,
}

impl VerifiedRecord {
    pub fn id(&self) -> &IntentId {
        &self.intent.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
    const DISCORD: &str = "123456789012345678";

    fn sample_intent() -> PaymentIntent {
        PaymentIntent {
            id: IntentId::from_bytes([7; 16]),
            identity: Identity::parse(Some(DISCORD), Some(WALLET), Some("@alice_1")).unwrap(),
            amount: Lamports::new(4210),
            receiving_address: Some(WalletAddress::new("Recv1111111111111111111111111111")),
            created_at: Timestamp::new(1_000),
            expires_at: Timestamp::new(901_000),
            state: IntentState::Pending,
        }
    }

    #[test]
    fn parse_strips_handle_prefix() {
        let identity = Identity::parse(Some(DISCORD), Some(WALLET), Some("@alice_1")).unwrap();
        assert_eq!(identity.secondary_handle.as_deref(), Some("alice_1"));
    }

    #[test]
    fn parse_treats_blank_handle_as_absent() {
        let identity = Identity::parse(Some(DISCORD), Some(WALLET), Some("  ")).unwrap();
        assert!(identity.secondary_handle.is_none());
    }

    #[test]
    fn parse_reports_missing_fields() {
        assert_eq!(
            Identity::parse(None, Some(WALLET), None).unwrap_err(),
            ValidationError::MissingField("discordId")
        );
        assert_eq!(
            Identity::parse(Some(DISCORD), Some("   "), None).unwrap_err(),
            ValidationError::MissingField("walletAddress")
        );
    }

    #[test]
    fn parse_rejects_malformed_fields() {
        assert!(Identity::parse(Some("12ab"), Some(WALLET), None).is_err());
        assert!(Identity::parse(Some(DISCORD), Some(WALLET), Some("has space")).is_err());
        assert!(Identity::parse(Some(DISCORD), Some(WALLET), Some("sixteen_chars_xx")).is_err());
    }

    #[test]
    fn expiry_is_inclusive_of_the_deadline() {
        let intent = sample_intent();
        assert!(!intent.is_expired(Timestamp::new(900_999)));
        assert!(intent.is_expired(Timestamp::new(901_000)));
    }

    #[test]
    fn intent_uses_camel_case_layout() {
        let json = serde_json::to_value(sample_intent()).unwrap();
        assert_eq!(json["discordId"], DISCORD);
        assert_eq!(json["walletAddress"], WALLET);
        assert_eq!(json["twitterHandle"], "alice_1");
        assert_eq!(json["amount"], "0.000004210");
        assert_eq!(json["expiresAt"], 901_000);
        assert_eq!(json["state"], "pending");
    }

    #[test]
    fn reads_legacy_records_keyed_by_token() {
        let legacy = serde_json::json!({
            "discordId": DISCORD,
            "twitterHandle": "alice",
            "walletAddress": WALLET,
            "token": "c0ffee",
            "expiresAt": 5,
            "amount": "0.00000421",
            "receivingAddress": "Recv1111111111111111111111111111"
        });
        let intent: PaymentIntent = serde_json::from_value(legacy).unwrap();
        assert_eq!(intent.id.as_str(), "c0ffee");
        assert_eq!(intent.state, IntentState::Pending);
        assert_eq!(intent.amount.raw(), 4210);
    }

    #[test]
    fn verified_record_copies_intent() {
        let intent = sample_intent();
        let record = intent.to_verified(TxSignature::new("sig"), Timestamp::new(2_000));
        assert_eq!(record.intent.state, IntentState::Verified);
        assert_eq!(intent.state, IntentState::Pending);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["signature"], "sig");
        assert_eq!(json["verifiedAt"], 2_000);
        assert_eq!(json["discordId"], DISCORD);
    }
}
