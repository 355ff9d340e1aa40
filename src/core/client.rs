//! Caller-facing hex exchange client.
//!
//! A single worker task owns the transport and runs connect, disconnect and
//! send strictly one after another. Callers talk to it over a command queue
//! and read status straight from shared state, so status queries never wait
//! behind socket I/O.

use crate::core::activity::ActivityLog;
use crate::core::exchange::ExchangeEngine;
use crate::core::response::{ConnectResponse, DisconnectResponse, SendResponse};
use crate::core::status::{Status, StatusReporter};
use crate::core::transport::{Connection, ConnectionState, Transport};
use crate::domain::config::ClientConfig;
use crate::domain::error::{TcpHexError, TcpHexResult};
use crate::infrastructure::tcp::session::{SessionOptions, TcpSession};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

const COMMAND_QUEUE_SIZE: usize = 32;

enum Command {
    Connect {
        host: String,
        port: u16,
        reply: oneshot::Sender<ConnectResponse>,
    },
    Disconnect {
        reply: oneshot::Sender<DisconnectResponse>,
    },
    Send {
        hex: String,
        repeat_count: u32,
        reply: oneshot::Sender<TcpHexResult<SendResponse>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to the exchange client. Cheap to clone; every clone drives the
/// same connection.
#[derive(Clone)]
pub struct HexClient {
    commands: mpsc::Sender<Command>,
    reporter: StatusReporter,
    log: Arc<ActivityLog>,
}

impl HexClient {
    /// Start a client over a real TCP socket. Must be called from within a
    /// tokio runtime.
    pub fn new(config: &ClientConfig) -> Self {
        let log = Arc::new(ActivityLog::new(config.log_capacity));
        let session = TcpSession::new(Arc::clone(&log), SessionOptions::from(config));
        Self::with_transport(session, log, config)
    }

    /// Start a client over any transport sharing `log`.
    pub fn with_transport<T>(transport: T, log: Arc<ActivityLog>, config: &ClientConfig) -> Self
    where
        T: Transport + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_SIZE);
        let (state_tx, state_rx) = watch::channel(transport.connection());

        let worker = Worker {
            transport,
            engine: ExchangeEngine::new(Arc::clone(&log), config),
            connect_timeout: config.connect_timeout(),
            state: state_tx,
        };
        tokio::spawn(worker.run(command_rx));

        log.info("TCP client initialized");

        Self {
            commands: command_tx,
            reporter: StatusReporter::new(state_rx, Arc::clone(&log)),
            log,
        }
    }

    /// Connect to `host:port`, replacing any current connection.
    ///
    /// Socket-level failures come back as `connected: false` with the
    /// reason; only a missing host or port is an error.
    pub async fn connect(&self, host: &str, port: u16) -> TcpHexResult<ConnectResponse> {
        let host = host.trim();
        if host.is_empty() {
            return Err(TcpHexError::MissingParameter("ipAddress"));
        }
        if port == 0 {
            return Err(TcpHexError::MissingParameter("port"));
        }

        self.request(|reply| Command::Connect {
            host: host.to_string(),
            port,
            reply,
        })
        .await
    }

    pub async fn disconnect(&self) -> TcpHexResult<DisconnectResponse> {
        self.request(|reply| Command::Disconnect { reply }).await
    }

    /// Send `hex` `repeat_count` times over the current connection.
    pub async fn send(&self, hex: &str, repeat_count: u32) -> TcpHexResult<SendResponse> {
        if hex.trim().is_empty() {
            return Err(TcpHexError::MissingParameter("hexCode"));
        }

        self.request(|reply| Command::Send {
            hex: hex.to_string(),
            repeat_count,
            reply,
        })
        .await?
    }

    /// Current connection state and log. Never blocks on socket I/O.
    pub fn status(&self) -> Status {
        self.reporter.status()
    }

    pub fn connection(&self) -> Connection {
        self.reporter.connection()
    }

    pub fn is_connected(&self) -> bool {
        self.connection().is_connected()
    }

    pub fn log(&self) -> &Arc<ActivityLog> {
        &self.log
    }

    /// Close the connection and stop the worker. Later calls on any clone
    /// fail with `WorkerStopped`.
    pub async fn shutdown(&self) -> TcpHexResult<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    async fn request<R>(&self, command: impl FnOnce(oneshot::Sender<R>) -> Command) -> TcpHexResult<R> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .await
            .map_err(|_| TcpHexError::WorkerStopped)?;
        reply_rx.await.map_err(|_| TcpHexError::WorkerStopped)
    }
}

struct Worker<T> {
    transport: T,
    engine: ExchangeEngine,
    connect_timeout: Duration,
    state: watch::Sender<Connection>,
}

impl<T: Transport> Worker<T> {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        debug!("Client worker started");
        let mut shutdown_reply = None;

        while let Some(command) = commands.recv().await {
            match command {
                Command::Connect { host, port, reply } => {
                    let response = self.connect(&host, port).await;
                    let _ = reply.send(response);
                }
                Command::Disconnect { reply } => {
                    let response = match self.transport.disconnect().await {
                        Ok(()) => DisconnectResponse::disconnected(),
                        Err(e) => DisconnectResponse::failed(&e),
                    };
                    self.publish();
                    let _ = reply.send(response);
                }
                Command::Send {
                    hex,
                    repeat_count,
                    reply,
                } => {
                    let state = &self.state;
                    let result = self
                        .engine
                        .send_observed(&mut self.transport, &hex, repeat_count, |transport| {
                            state.send_replace(transport.connection());
                        })
                        .await
                        .map(SendResponse::from);
                    self.publish();
                    let _ = reply.send(result);
                }
                Command::Shutdown { reply } => {
                    shutdown_reply = Some(reply);
                    break;
                }
            }
        }

        if let Err(e) = self.transport.disconnect().await {
            warn!("Failed to close connection on shutdown: {}", e);
        }
        self.publish();
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
        info!("Client worker stopped");
    }

    async fn connect(&mut self, host: &str, port: u16) -> ConnectResponse {
        self.state.send_modify(|connection| {
            connection.remote_host = host.to_string();
            connection.remote_port = port;
            connection.state = ConnectionState::Connecting;
            connection.last_activity = None;
        });

        let result = self
            .transport
            .connect(host, port, self.connect_timeout)
            .await;
        self.publish();

        match result {
            Ok(()) => ConnectResponse::connected(),
            Err(e) => ConnectResponse::failed(&e),
        }
    }

    fn publish(&self) {
        self.state.send_replace(self.transport.connection());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::activity::LogKind;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn fast_config() -> ClientConfig {
        ClientConfig {
            connect_timeout_ms: 1000,
            read_timeout_ms: 200,
            ..ClientConfig::default()
        }
    }

    async fn spawn_echo_server() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0; 1024];
                    while let Ok(n) = socket.read(&mut buf).await {
                        if n == 0 || socket.write_all(&buf[..n]).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        port
    }

    #[tokio::test]
    async fn test_initial_status() {
        let client = HexClient::new(&fast_config());
        let status = client.status();

        assert!(!status.connected);
        assert_eq!(status.log.len(), 1);
        assert_eq!(status.log[0].message(), "TCP client initialized");
    }

    #[tokio::test]
    async fn test_connect_send_disconnect() {
        let port = spawn_echo_server().await;
        let client = HexClient::new(&fast_config());

        let response = client.connect("127.0.0.1", port).await.unwrap();
        assert!(response.connected);
        assert!(client.is_connected());
        assert_eq!(
            client.status().connection_info,
            Some(format!("127.0.0.1:{}", port))
        );

        let response = client.send("48656C6C6F", 1).await.unwrap();
        assert_eq!(response.success[&0].received, "48656C6C6F");
        assert!(response.errors.is_none());

        let response = client.disconnect().await.unwrap();
        assert!(response.disconnected);
        assert!(!client.status().connected);

        // Idempotent
        assert!(client.disconnect().await.unwrap().disconnected);
    }

    #[tokio::test]
    async fn test_missing_parameters() {
        let client = HexClient::new(&fast_config());

        assert!(matches!(
            client.connect("  ", 80).await,
            Err(TcpHexError::MissingParameter("ipAddress"))
        ));
        assert!(matches!(
            client.connect("127.0.0.1", 0).await,
            Err(TcpHexError::MissingParameter("port"))
        ));
        assert!(matches!(
            client.send("", 1).await,
            Err(TcpHexError::MissingParameter("hexCode"))
        ));
    }

    #[tokio::test]
    async fn test_send_while_disconnected_leaves_log_untouched() {
        let client = HexClient::new(&fast_config());
        let before = client.log().len();

        let result = client.send("0102", 1).await;
        assert!(matches!(result, Err(TcpHexError::NotConnected)));
        assert_eq!(client.log().len(), before);
    }

    #[tokio::test]
    async fn test_status_while_send_in_flight() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((_socket, _)) = listener.accept().await {
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        });

        let client = HexClient::new(&ClientConfig {
            read_timeout_ms: 500,
            ..fast_config()
        });
        client.connect("127.0.0.1", port).await.unwrap();

        let sender = client.clone();
        let send = tokio::spawn(async move { sender.send("0102", 1).await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        let started = std::time::Instant::now();
        let status = client.status();
        assert!(started.elapsed() < Duration::from_millis(50));
        assert!(status.connected);

        let response = send.await.unwrap().unwrap();
        assert_eq!(response.success[&0].received, "");
    }

    #[tokio::test]
    async fn test_last_activity_advances_during_batch() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                // Swallow everything without answering
                let mut buf = [0; 1024];
                while let Ok(n) = socket.read(&mut buf).await {
                    if n == 0 {
                        break;
                    }
                }
            }
        });

        let client = HexClient::new(&ClientConfig {
            read_timeout_ms: 300,
            ..fast_config()
        });
        client.connect("127.0.0.1", port).await.unwrap();
        let before = client.status().last_activity;
        assert!(before.is_some());

        let sender = client.clone();
        let send = tokio::spawn(async move { sender.send("01", 6).await });

        tokio::time::sleep(Duration::from_millis(1000)).await;
        let mid = client.status().last_activity;
        assert!(mid > before, "lastActivity did not move: {:?} -> {:?}", before, mid);

        let response = send.await.unwrap().unwrap();
        assert_eq!(response.total(), 6);
        assert!(client.status().last_activity >= mid);
    }

    #[tokio::test]
    async fn test_shutdown_stops_worker() {
        let port = spawn_echo_server().await;
        let client = HexClient::new(&fast_config());
        client.connect("127.0.0.1", port).await.unwrap();

        client.shutdown().await.unwrap();
        assert!(!client.is_connected());
        assert!(matches!(
            client.send("01", 1).await,
            Err(TcpHexError::WorkerStopped)
        ));
        assert!(client
            .log()
            .snapshot()
            .iter()
            .any(|e| e.kind() == LogKind::Info && e.message().starts_with("Disconnecting")));
    }
}
