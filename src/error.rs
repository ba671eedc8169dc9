//! Error types for the status relay

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Status relay error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A listening socket could not be bound
    #[error("Failed to bind {address}: {source}")]
    Bind {
        /// Address the bind was attempted on
        address: String,
        /// Underlying socket error
        source: std::io::Error,
    },

    /// Configuration file could not be parsed or written
    #[error("Configuration error: {0}")]
    Config(String),

    /// Protobuf decoding failed
    #[error("Decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Frame exceeds the maximum allowed size
    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(usize),

    /// Malformed frame or multipart message
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Peer closed the connection
    #[error("Connection closed")]
    ConnectionClosed,

    /// Snapshot acquisition failed
    #[error("Snapshot unavailable: {0}")]
    Snapshot(String),

    /// Command is missing or has malformed parameters
    #[error("wrong parameters")]
    WrongParameters,

    /// Command type is not supported
    #[error("unknown command")]
    UnknownCommand,

    /// Command was accepted but failed during execution
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// Service discovery registration or refresh failed
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
