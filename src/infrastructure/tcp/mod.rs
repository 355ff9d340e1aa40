// TCP module - socket session and local test server
pub mod server;
pub mod session;

pub use server::{ServerMode, TestServer};
pub use session::{SessionOptions, TcpSession};
