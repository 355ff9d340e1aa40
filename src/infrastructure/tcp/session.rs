use crate::core::activity::ActivityLog;
use crate::core::transport::{Connection, ConnectionState, Transport};
use crate::domain::config::ClientConfig;
use crate::domain::error::{TcpHexError, TcpHexResult};
use async_trait::async_trait;
use chrono::Local;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Socket options applied by a [`TcpSession`]
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub read_buffer_size: usize,
    pub write_timeout: Duration,
    pub no_delay: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for SessionOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            read_buffer_size: config.read_buffer_size.max(1),
            write_timeout: config.write_timeout(),
            no_delay: config.no_delay,
        }
    }
}

/// Owner of the single TCP socket.
///
/// `connection.state == Connected` holds exactly when `stream` is `Some`.
pub struct TcpSession {
    stream: Option<TcpStream>,
    connection: Connection,
    options: SessionOptions,
    log: Arc<ActivityLog>,
}

impl TcpSession {
    pub fn new(log: Arc<ActivityLog>, options: SessionOptions) -> Self {
        Self {
            stream: None,
            connection: Connection::default(),
            options,
            log,
        }
    }

    pub fn peer_addr(&self) -> Option<std::net::SocketAddr> {
        self.stream.as_ref().and_then(|stream| stream.peer_addr().ok())
    }

    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.stream.as_ref().and_then(|stream| stream.local_addr().ok())
    }

    fn touch(&mut self) {
        self.connection.last_activity = Some(Local::now());
    }

    /// Drop the socket after a fatal I/O error.
    fn reset(&mut self, reason: &str) {
        if self.stream.take().is_some() {
            warn!("Connection to {} reset: {}", self.connection.address(), reason);
        }
        self.connection.state = ConnectionState::Disconnected;
    }

    fn connect_error(&self, error: io::Error, timeout: Duration) -> TcpHexError {
        let addr = self.connection.address();
        match error.kind() {
            io::ErrorKind::ConnectionRefused => TcpHexError::ConnectRefused {
                addr,
                reason: error.to_string(),
            },
            io::ErrorKind::TimedOut => TcpHexError::ConnectTimeout {
                addr,
                timeout_ms: timeout.as_millis() as u64,
            },
            _ => TcpHexError::Io(error),
        }
    }
}

#[async_trait]
impl Transport for TcpSession {
    fn connection(&self) -> Connection {
        self.connection.clone()
    }

    async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> TcpHexResult<()> {
        if self.stream.is_some() {
            // disconnect() already records its own failure in the log
            if let Err(e) = self.disconnect().await {
                debug!("Continuing connect after failed close: {}", e);
            }
        }

        self.connection = Connection {
            remote_host: host.to_string(),
            remote_port: port,
            state: ConnectionState::Connecting,
            last_activity: None,
        };
        let addr = self.connection.address();
        self.log.info(format!("Connecting to {}", addr));

        let attempt = tokio::time::timeout(timeout, TcpStream::connect((host, port))).await;
        let stream = match attempt {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                let error = self.connect_error(e, timeout);
                self.connection.state = ConnectionState::Disconnected;
                self.log.error(format!("Connection failed: {}", error));
                return Err(error);
            }
            Err(_) => {
                let error = TcpHexError::ConnectTimeout {
                    addr,
                    timeout_ms: timeout.as_millis() as u64,
                };
                self.connection.state = ConnectionState::Disconnected;
                self.log.error(format!("Connection failed: {}", error));
                return Err(error);
            }
        };

        if self.options.no_delay {
            if let Err(e) = stream.set_nodelay(true) {
                warn!("Failed to set TCP_NODELAY: {}", e);
            }
        }

        self.stream = Some(stream);
        self.connection.state = ConnectionState::Connected;
        self.touch();
        self.log.info(format!("Connected successfully to {}", addr));
        Ok(())
    }

    async fn disconnect(&mut self) -> TcpHexResult<()> {
        let Some(mut stream) = self.stream.take() else {
            self.connection.state = ConnectionState::Disconnected;
            return Ok(());
        };

        self.log
            .info(format!("Disconnecting from {}", self.connection.address()));
        let result = stream.shutdown().await;
        drop(stream);
        self.connection.state = ConnectionState::Disconnected;

        match result {
            Ok(()) => Ok(()),
            // The peer already tore the connection down
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => {
                self.log.error(format!("Disconnect failed: {}", e));
                Err(TcpHexError::Io(e))
            }
        }
    }

    async fn write(&mut self, data: &[u8]) -> TcpHexResult<()> {
        let write_timeout = self.options.write_timeout;
        let stream = self.stream.as_mut().ok_or(TcpHexError::NotConnected)?;

        let result = tokio::time::timeout(write_timeout, async {
            stream.write_all(data).await?;
            stream.flush().await
        })
        .await
        .unwrap_or_else(|_| {
            Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("write did not complete within {}ms", write_timeout.as_millis()),
            ))
        });

        match result {
            Ok(()) => {
                debug!("Sent {} bytes over TCP", data.len());
                self.touch();
                Ok(())
            }
            Err(e) => {
                self.reset(&e.to_string());
                Err(TcpHexError::Io(e))
            }
        }
    }

    async fn read_with_timeout(&mut self, timeout: Duration) -> TcpHexResult<Vec<u8>> {
        let mut buffer = vec![0u8; self.options.read_buffer_size];
        let stream = self.stream.as_mut().ok_or(TcpHexError::NotConnected)?;

        match tokio::time::timeout(timeout, stream.read(&mut buffer)).await {
            Err(_) => {
                debug!("No data within {}ms", timeout.as_millis());
                Ok(Vec::new())
            }
            Ok(Ok(0)) => {
                self.reset("closed by peer");
                Err(TcpHexError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by peer",
                )))
            }
            Ok(Ok(n)) => {
                debug!("Received {} bytes over TCP", n);
                buffer.truncate(n);
                self.touch();
                Ok(buffer)
            }
            Ok(Err(e)) => {
                self.reset(&e.to_string());
                Err(TcpHexError::Io(e))
            }
        }
    }
}

impl Drop for TcpSession {
    fn drop(&mut self) {
        if self.stream.is_some() {
            debug!("TcpSession dropped while connected to {}", self.connection.address());
        }
    }
}
