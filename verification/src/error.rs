use dustproof_chain::ChainError;
use dustproof_store::StoreError;
use dustproof_types::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("upstream unavailable: {0}")]
    Upstream(#[from] ChainError),

    #[error("no unique intent id after {0} attempts")]
    IdExhausted(u32),

    #[error("config error: {0}")]
    Config(String),

    /// A blocking store task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}
