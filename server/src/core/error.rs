// mmo_world_server/server/src/core/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Encode error: {0}")]
    EncodeError(String),

    #[error("Packet too large: {size} bytes exceeds limit of {limit}")]
    PacketTooLarge { size: usize, limit: usize },

    #[error("Connection {0} is closed")]
    ConnectionClosed(u32),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
