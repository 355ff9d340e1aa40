use thiserror::Error;

/// TcpHex unified error type
#[derive(Error, Debug)]
pub enum TcpHexError {
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Not connected to a server")]
    NotConnected,

    #[error("Connection timeout to {addr} after {timeout_ms}ms")]
    ConnectTimeout { addr: String, timeout_ms: u64 },

    #[error("Connection refused by {addr}: {reason}")]
    ConnectRefused { addr: String, reason: String },

    #[error("Network error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("Client worker has stopped")]
    WorkerStopped,
}

impl TcpHexError {
    /// True for failures that reject a call before any work is done.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            TcpHexError::MissingParameter(_)
                | TcpHexError::NotConnected
                | TcpHexError::InvalidInput(_)
        )
    }
}

pub type TcpHexResult<T> = Result<T, TcpHexError>;
