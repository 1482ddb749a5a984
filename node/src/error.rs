use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] dustproof_store::StoreError),

    #[error("chain error: {0}")]
    Chain(#[from] dustproof_chain::ChainError),

    #[error("verification error: {0}")]
    Verify(#[from] dustproof_verification::VerifyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("HTTP server error: {0}")]
    Rpc(String),

    #[error("WebSocket server error: {0}")]
    WebSocket(String),
}
