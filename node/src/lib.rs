//! Dustproof verifier node: wires the stores, the chain poller, the
//! reconciler, the expiry sweep, and the HTTP and WebSocket servers into one
//! process.
//!
//! The node runs two timers and two servers:
//! - Reconcile tick every `poll_interval_ms`
//! - Expiry sweep (and retry of failed store writes) every `sweep_interval_secs`
//! - HTTP API on `http_port`
//! - Verified-event push on `websocket_port`

pub mod config;
pub mod error;
pub mod logging;
pub mod node;
pub mod shutdown;

pub use config::ServiceConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use node::VerifierNode;
pub use shutdown::{stopped, ShutdownController};
