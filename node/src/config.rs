//! Service configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use dustproof_utils::RetryPolicy;
use dustproof_verification::CollisionPolicy;

use crate::{LogFormat, NodeError};

/// Configuration for a verifier node.
///
/// Loaded from a TOML file via [`ServiceConfig::from_toml_file`] (every
/// field has a default except `receiving_address`), then overridden from the
/// command line or environment by the daemon.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Solana JSON-RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Address transfers are matched against.
    #[serde(default)]
    pub receiving_address: String,

    /// Address shown to users by `/api/address`. Defaults to the receiving
    /// address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_address: Option<String>,

    /// Directory holding the pending, verified and consumed collections.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    #[serde(default = "default_websocket_port")]
    pub websocket_port: u16,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Recent signatures fetched per poll.
    #[serde(default = "default_signature_limit")]
    pub signature_limit: usize,

    #[serde(default = "default_intent_ttl_secs")]
    pub intent_ttl_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    #[serde(default = "default_min_amount_lamports")]
    pub min_amount_lamports: u64,

    #[serde(default = "default_max_amount_lamports")]
    pub max_amount_lamports: u64,

    /// Redraw amounts already held by a pending intent.
    #[serde(default = "default_true")]
    pub avoid_amount_collisions: bool,

    #[serde(default = "default_max_allocation_attempts")]
    pub max_allocation_attempts: u32,

    #[serde(default)]
    pub collision_policy: CollisionPolicy,

    /// Consumed signatures remembered before the oldest are evicted.
    #[serde(default = "default_consumed_capacity")]
    pub consumed_capacity: usize,

    #[serde(default = "default_rpc_max_attempts")]
    pub rpc_max_attempts: u32,

    #[serde(default = "default_rpc_retry_delay_ms")]
    pub rpc_retry_delay_ms: u64,

    /// Events a subscriber may fall behind before it starts losing them.
    #[serde(default = "default_notifier_capacity")]
    pub notifier_capacity: usize,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./dustproof_data")
}

fn default_http_port() -> u16 {
    3000
}

fn default_websocket_port() -> u16 {
    4000
}

fn default_poll_interval_ms() -> u64 {
    10_000
}

fn default_signature_limit() -> usize {
    dustproof_chain::poller::DEFAULT_SIGNATURE_LIMIT
}

fn default_intent_ttl_secs() -> u64 {
    dustproof_verification::DEFAULT_INTENT_TTL.as_secs()
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_min_amount_lamports() -> u64 {
    dustproof_verification::allocator::DEFAULT_MIN_LAMPORTS
}

fn default_max_amount_lamports() -> u64 {
    dustproof_verification::allocator::DEFAULT_MAX_LAMPORTS
}

fn default_true() -> bool {
    true
}

fn default_max_allocation_attempts() -> u32 {
    dustproof_verification::allocator::DEFAULT_MAX_ATTEMPTS
}

fn default_consumed_capacity() -> usize {
    10_000
}

fn default_rpc_max_attempts() -> u32 {
    3
}

fn default_rpc_retry_delay_ms() -> u64 {
    500
}

fn default_notifier_capacity() -> usize {
    dustproof_websocket::DEFAULT_CHANNEL_CAPACITY
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ServiceConfig {
    /// Defaults with the given receiving address.
    pub fn new(receiving_address: impl Into<String>) -> Self {
        Self {
            receiving_address: receiving_address.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Reject configurations the node cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.receiving_address.trim().is_empty() {
            return Err(NodeError::Config("receiving_address is required".into()));
        }
        if self.rpc_url.trim().is_empty() {
            return Err(NodeError::Config("rpc_url must not be empty".into()));
        }
        if self.poll_interval_ms == 0 || self.sweep_interval_secs == 0 {
            return Err(NodeError::Config("poll and sweep intervals must be positive".into()));
        }
        if self.intent_ttl_secs == 0 {
            return Err(NodeError::Config("intent_ttl_secs must be positive".into()));
        }
        if self.min_amount_lamports == 0 || self.min_amount_lamports > self.max_amount_lamports {
            return Err(NodeError::Config(format!(
                "amount range {}..={} lamports is empty",
                self.min_amount_lamports, self.max_amount_lamports
            )));
        }
        if self.signature_limit == 0 || self.consumed_capacity < self.signature_limit {
            return Err(NodeError::Config(
                "consumed_capacity must be at least signature_limit, which must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn display_address(&self) -> &str {
        self.display_address
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(&self.receiving_address)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn intent_ttl(&self) -> Duration {
        Duration::from_secs(self.intent_ttl_secs)
    }

    pub fn rpc_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.rpc_max_attempts.max(1),
            Duration::from_millis(self.rpc_retry_delay_ms),
        )
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            receiving_address: String::new(),
            display_address: None,
            data_dir: default_data_dir(),
            http_port: default_http_port(),
            websocket_port: default_websocket_port(),
            poll_interval_ms: default_poll_interval_ms(),
            signature_limit: default_signature_limit(),
            intent_ttl_secs: default_intent_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            min_amount_lamports: default_min_amount_lamports(),
            max_amount_lamports: default_max_amount_lamports(),
            avoid_amount_collisions: default_true(),
            max_allocation_attempts: default_max_allocation_attempts(),
            collision_policy: CollisionPolicy::default(),
            consumed_capacity: default_consumed_capacity(),
            rpc_max_attempts: default_rpc_max_attempts(),
            rpc_retry_delay_ms: default_rpc_retry_delay_ms(),
            notifier_capacity: default_notifier_capacity(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}
