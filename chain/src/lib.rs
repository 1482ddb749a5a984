//! Chain access for the verification protocol.
//!
//! - [`ChainSource`]: the seam between the poller and a chain endpoint.
//! - [`SolanaRpcClient`]: JSON-RPC implementation over HTTP at `confirmed`
//!   commitment.
//! - [`decode`]: extraction of system-program transfers from `jsonParsed`
//!   transactions.
//! - [`ChainPoller`]: one poll tick, producing the signatures examined and
//!   the transfer observations found in them.

pub mod decode;
pub mod error;
pub mod poller;
pub mod rpc;
pub mod source;

pub use error::ChainError;
pub use poller::{ChainPoller, ExaminedSignature};
pub use rpc::SolanaRpcClient;
pub use source::{ChainSource, ParsedTransaction, SignatureInfo, SystemTransfer};
