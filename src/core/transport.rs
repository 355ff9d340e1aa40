use crate::core::activity::{format_timestamp, serialize_optional_timestamp};
use crate::domain::error::TcpHexResult;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No socket; also the resting state after a failed connect
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
        }
    }
}

/// The single connection owned by a transport
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub remote_host: String,
    pub remote_port: u16,
    pub state: ConnectionState,
    #[serde(serialize_with = "serialize_optional_timestamp")]
    pub last_activity: Option<DateTime<Local>>,
}

impl Connection {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// `host:port` of the remote end
    pub fn address(&self) -> String {
        format!("{}:{}", self.remote_host, self.remote_port)
    }

    pub fn last_activity_display(&self) -> Option<String> {
        self.last_activity.as_ref().map(format_timestamp)
    }
}

/// Byte transport the exchange engine runs over.
///
/// Implementations own at most one connection and are driven by a single
/// task at a time; no method may block past the timeout it is given.
#[async_trait]
pub trait Transport: Send {
    /// Snapshot of the current connection
    fn connection(&self) -> Connection;

    fn is_connected(&self) -> bool {
        self.connection().is_connected()
    }

    /// Open a connection, closing any existing one first
    async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> TcpHexResult<()>;

    /// Close the connection; a no-op when already disconnected
    async fn disconnect(&mut self) -> TcpHexResult<()>;

    /// Write the whole payload
    async fn write(&mut self, data: &[u8]) -> TcpHexResult<()>;

    /// Wait up to `timeout` for at least one byte. An empty buffer means
    /// nothing arrived in time.
    async fn read_with_timeout(&mut self, timeout: Duration) -> TcpHexResult<Vec<u8>>;
}
