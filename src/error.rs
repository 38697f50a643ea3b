//! Error types for NagaBridge

use thiserror::Error;

/// NagaBridge error type
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Invalid action {action} for {space}-action space")]
    InvalidAction { action: usize, space: usize },

    #[error("Timed out waiting for a state frame")]
    Timeout,

    #[error("Transport worker terminated")]
    TransportTerminated,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for BridgeError {
    fn from(e: toml::de::Error) -> Self {
        BridgeError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
