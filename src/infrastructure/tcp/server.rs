use crate::domain::error::{TcpHexError, TcpHexResult};
use crate::core::codec;
use serde::Serialize;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

/// How the test server answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    /// Write every received chunk straight back
    Echo,
    /// Accept and read, never reply
    Silent,
}

impl fmt::Display for ServerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMode::Echo => write!(f, "echo"),
            ServerMode::Silent => write!(f, "silent"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConnection {
    pub addr: SocketAddr,
    pub connected_at: std::time::SystemTime,
    pub bytes_received: u64,
    pub bytes_sent: u64,
}

#[derive(Debug, Clone)]
pub struct ServerStats {
    pub bind_addr: SocketAddr,
    pub mode: ServerMode,
    pub client_count: usize,
    pub total_bytes_received: u64,
    pub total_bytes_sent: u64,
}

type Clients = Arc<Mutex<Vec<ClientConnection>>>;

/// Local TCP peer for exercising the client: echoes or stays silent.
pub struct TestServer {
    listener: Option<TcpListener>,
    bind_addr: SocketAddr,
    mode: ServerMode,
    clients: Clients,
    shutdown: watch::Sender<bool>,
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn bind(bind_addr: &str, mode: ServerMode) -> TcpHexResult<Self> {
        let listener = TcpListener::bind(bind_addr).await.map_err(|e| {
            TcpHexError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to bind to {}: {}", bind_addr, e),
            ))
        })?;
        let actual_addr = listener.local_addr()?;
        let (shutdown, _) = watch::channel(false);

        info!("{} server created on {}", mode, actual_addr);

        Ok(Self {
            listener: Some(listener),
            bind_addr: actual_addr,
            mode,
            clients: Arc::new(Mutex::new(Vec::new())),
            shutdown,
            server_handle: None,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    pub fn mode(&self) -> ServerMode {
        self.mode
    }

    pub fn start(&mut self) -> TcpHexResult<()> {
        let listener = self.listener.take().ok_or_else(|| {
            TcpHexError::InvalidInput("Server is already running".to_string())
        })?;

        info!("Starting {} server on {}", self.mode, self.bind_addr);

        let clients = Arc::clone(&self.clients);
        let mode = self.mode;
        let mut shutdown = self.shutdown.subscribe();

        let server_handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok((stream, addr)) => {
                                info!("New client connected: {}", addr);
                                clients.lock().await.push(ClientConnection {
                                    addr,
                                    connected_at: std::time::SystemTime::now(),
                                    bytes_received: 0,
                                    bytes_sent: 0,
                                });

                                let clients = Arc::clone(&clients);
                                let shutdown = shutdown.clone();
                                tokio::spawn(async move {
                                    if let Err(e) = Self::handle_client(stream, addr, mode, &clients, shutdown).await {
                                        error!("Error handling client {}: {}", addr, e);
                                    }
                                    clients.lock().await.retain(|c| c.addr != addr);
                                    info!("Client disconnected: {}", addr);
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept connection: {}", e);
                            }
                        }
                    }
                    _ = shutdown.changed() => {
                        info!("Received shutdown signal, stopping server");
                        break;
                    }
                }
            }
        });

        self.server_handle = Some(server_handle);
        Ok(())
    }

    async fn handle_client(
        mut stream: TcpStream,
        addr: SocketAddr,
        mode: ServerMode,
        clients: &Clients,
        mut shutdown: watch::Receiver<bool>,
    ) -> TcpHexResult<()> {
        let mut buffer = vec![0u8; 4096];

        loop {
            let n = tokio::select! {
                read = stream.read(&mut buffer) => read?,
                _ = shutdown.changed() => break,
            };
            if n == 0 {
                debug!("Client {} disconnected gracefully", addr);
                break;
            }

            let data = &buffer[..n];
            debug!("Received {} bytes from {}: {}", n, addr, codec::encode_spaced(data));
            Self::record(clients, addr, |client| client.bytes_received += n as u64).await;

            if mode == ServerMode::Echo {
                stream.write_all(data).await?;
                stream.flush().await?;
                Self::record(clients, addr, |client| client.bytes_sent += n as u64).await;
                debug!("Echoed {} bytes back to {}", n, addr);
            }
        }

        Ok(())
    }

    async fn record(clients: &Clients, addr: SocketAddr, update: impl FnOnce(&mut ClientConnection)) {
        let mut clients = clients.lock().await;
        if let Some(client) = clients.iter_mut().find(|c| c.addr == addr) {
            update(client);
        }
    }

    /// Stop accepting, close every client connection and wait for the
    /// accept loop to finish.
    pub async fn shutdown(&mut self) -> TcpHexResult<()> {
        if let Some(handle) = self.server_handle.take() {
            info!("Stopping {} server", self.mode);
            self.shutdown.send_replace(true);

            if let Err(e) = handle.await {
                warn!("Server task completed with error: {}", e);
            }
            info!("{} server stopped", self.mode);
        }
        Ok(())
    }

    pub async fn client_count(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn stats(&self) -> ServerStats {
        let clients = self.clients.lock().await;
        ServerStats {
            bind_addr: self.bind_addr,
            mode: self.mode,
            client_count: clients.len(),
            total_bytes_received: clients.iter().map(|c| c.bytes_received).sum(),
            total_bytes_sent: clients.iter().map(|c| c.bytes_sent).sum(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.server_handle.is_some()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.server_handle.is_some() {
            self.shutdown.send_replace(true);
            debug!("TestServer on {} dropped while running", self.bind_addr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_server_creation() {
        let server = TestServer::bind("127.0.0.1:0", ServerMode::Echo).await.unwrap();
        assert!(!server.is_running());
        assert_eq!(server.mode(), ServerMode::Echo);
        assert_ne!(server.local_addr().port(), 0);
        assert_eq!(server.client_count().await, 0);
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let mut server = TestServer::bind("127.0.0.1:0", ServerMode::Echo).await.unwrap();
        server.start().unwrap();
        assert!(server.is_running());
        assert!(server.start().is_err());

        server.shutdown().await.unwrap();
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn test_echo_mode() {
        let mut server = TestServer::bind("127.0.0.1:0", ServerMode::Echo).await.unwrap();
        server.start().unwrap();

        let mut client = TcpStream::connect(server.local_addr()).await.unwrap();
        client.write_all(&[0xA0, 0x01, 0x01, 0xA2]).await.unwrap();

        let mut response = [0u8; 4];
        client.read_exact(&mut response).await.unwrap();
        assert_eq!(response, [0xA0, 0x01, 0x01, 0xA2]);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let stats = server.stats().await;
        assert_eq!(stats.client_count, 1);
        assert_eq!(stats.total_bytes_received, 4);
        assert_eq!(stats.total_bytes_sent, 4);

        drop(client);
        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_silent_mode() {
        let mut server = TestServer::bind("127.0.0.1:0", ServerMode::Silent).await.unwrap();
        server.start().unwrap();

        let mut client = TcpStream::connect(server.local_addr()).await.unwrap();
        client.write_all(&[0x01, 0x02]).await.unwrap();

        let mut buf = [0u8; 8];
        let read = tokio::time::timeout(Duration::from_millis(100), client.read(&mut buf)).await;
        assert!(read.is_err(), "silent server must not reply");

        let stats = server.stats().await;
        assert_eq!(stats.total_bytes_received, 2);
        assert_eq!(stats.total_bytes_sent, 0);

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_clients() {
        let mut server = TestServer::bind("127.0.0.1:0", ServerMode::Silent).await.unwrap();
        server.start().unwrap();

        let mut client = TcpStream::connect(server.local_addr()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        server.shutdown().await.unwrap();

        let mut buf = [0u8; 8];
        let read = tokio::time::timeout(Duration::from_secs(1), client.read(&mut buf))
            .await
            .expect("client should observe the close");
        assert!(matches!(read, Ok(0) | Err(_)));
    }
}
