use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("connect failed: {0}")]
    Connect(String),
}

/// Failure to push to one subscriber. Logged by the forwarder that hit it and
/// never propagated past that connection.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("subscriber disconnected")]
    Closed,

    #[error("send failed: {0}")]
    Send(String),
}
