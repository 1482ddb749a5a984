use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    /// The endpoint could not be reached or timed out.
    #[error("chain RPC unavailable: {0}")]
    Unavailable(String),

    /// The endpoint answered with a JSON-RPC error object.
    #[error("chain RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The endpoint answered with something that is not the expected shape.
    #[error("invalid chain RPC response: {0}")]
    InvalidResponse(String),
}

impl ChainError {
    /// Whether the endpoint itself could not be reached. Every other error
    /// concerns one request's answer and says nothing about the next one.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
