// Core module - codec, exchange engine and the client worker
pub mod activity;
pub mod client;
pub mod codec;
pub mod exchange;
pub mod response;
pub mod status;
pub mod transport;

pub use activity::{ActivityLog, LogEntry, LogKind};
pub use client::HexClient;
pub use exchange::{ExchangeEngine, ExchangeResult};
pub use response::{ConnectResponse, DisconnectResponse, ExchangeReply, SendResponse};
pub use status::{Status, StatusReporter};
pub use transport::{Connection, ConnectionState, Transport};
