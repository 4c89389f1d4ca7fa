use thiserror::Error;

#[derive(Error, Debug)]
pub enum LossyrpcError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Application error: {0}")]
    Application(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LossyrpcError {
    /// Returns true for envelope-level failures (undecodable or oversized payloads).
    pub fn is_protocol(&self) -> bool {
        matches!(self, LossyrpcError::Protocol(_) | LossyrpcError::JsonSerialization(_))
    }
}

pub type Result<T> = std::result::Result<T, LossyrpcError>;
