//! tcphex Library
//!
//! TCP client for exchanging hex-encoded byte payloads with networked
//! devices: hex codec, bounded activity log, single-flight exchange client
//! and a local echo/silent test server.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::client::HexClient;
pub use crate::core::codec;
pub use crate::core::response::{ConnectResponse, DisconnectResponse, SendResponse};
pub use crate::core::status::Status;
pub use crate::domain::config::{ClientConfig, TcpHexConfig};
pub use crate::domain::error::{TcpHexError, TcpHexResult};
