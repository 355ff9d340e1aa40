use crate::core::activity::{ActivityLog, LogKind};
use crate::core::codec::{self, HexFormat};
use crate::core::transport::Transport;
use crate::domain::config::ClientConfig;
use crate::domain::error::{TcpHexError, TcpHexResult};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Outcome of one send/receive iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeResult {
    pub index: usize,
    /// Hex exactly as the caller supplied it
    pub sent: String,
    /// Reply as hex; empty when nothing arrived before the read timeout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExchangeResult {
    fn answered(index: usize, sent: &str, received: String) -> Self {
        Self {
            index,
            sent: sent.to_string(),
            received: Some(received),
            error: None,
        }
    }

    fn failed(index: usize, sent: &str, error: String) -> Self {
        Self {
            index,
            sent: sent.to_string(),
            received: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// True when the iteration succeeded but the peer stayed silent
    pub fn is_silent(&self) -> bool {
        matches!(self.received.as_deref(), Some(""))
    }
}

/// Runs repeated hex exchanges over a [`Transport`], one at a time.
pub struct ExchangeEngine {
    log: Arc<ActivityLog>,
    read_timeout: Duration,
    max_repeat_count: u32,
    format: HexFormat,
}

impl ExchangeEngine {
    pub fn new(log: Arc<ActivityLog>, config: &ClientConfig) -> Self {
        Self {
            log,
            read_timeout: config.read_timeout(),
            max_repeat_count: config.max_repeat_count.max(1),
            format: HexFormat::new(config.spaced_hex),
        }
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Send `hex` `repeat_count` times, collecting one result per iteration.
    ///
    /// Rejects the whole call, without logging or touching the socket, when
    /// `hex` is blank, the repeat count is out of range or the transport is
    /// not connected. Individual iteration failures are reported in the
    /// returned results instead.
    pub async fn send<T>(
        &self,
        transport: &mut T,
        hex: &str,
        repeat_count: u32,
    ) -> TcpHexResult<Vec<ExchangeResult>>
    where
        T: Transport + ?Sized,
    {
        self.send_observed(transport, hex, repeat_count, |_| {}).await
    }

    /// Like [`send`](Self::send), calling `after_each` with the transport
    /// once every iteration has finished.
    pub async fn send_observed<T, F>(
        &self,
        transport: &mut T,
        hex: &str,
        repeat_count: u32,
        mut after_each: F,
    ) -> TcpHexResult<Vec<ExchangeResult>>
    where
        T: Transport + ?Sized,
        F: FnMut(&T) + Send,
    {
        let hex = hex.trim();
        if hex.is_empty() {
            return Err(TcpHexError::MissingParameter("hexCode"));
        }
        let total = self.effective_repeat_count(repeat_count)?;
        if !transport.is_connected() {
            return Err(TcpHexError::NotConnected);
        }

        debug!("Starting exchange of {} with repeat count {}", hex, total);
        let payload = codec::decode(hex).map_err(|e| e.to_string());

        let mut results = Vec::with_capacity(total as usize);
        for index in 0..total as usize {
            let result = self
                .exchange_once(transport, hex, &payload, index, total)
                .await;
            results.push(result);
            after_each(&*transport);
        }

        let failures = results.iter().filter(|r| !r.is_success()).count();
        debug!("Completed {}/{} exchanges", results.len() - failures, total);
        Ok(results)
    }

    fn effective_repeat_count(&self, repeat_count: u32) -> TcpHexResult<u32> {
        match repeat_count {
            0 => Ok(1),
            n if n > self.max_repeat_count => Err(TcpHexError::InvalidInput(format!(
                "Repeat count must be between 1 and {}",
                self.max_repeat_count
            ))),
            n => Ok(n),
        }
    }

    async fn exchange_once<T>(
        &self,
        transport: &mut T,
        hex: &str,
        payload: &Result<Vec<u8>, String>,
        index: usize,
        total: u32,
    ) -> ExchangeResult
    where
        T: Transport + ?Sized,
    {
        let label = repeat_label(index, total);

        let bytes = match payload {
            Ok(bytes) => bytes,
            Err(e) => return self.fail(index, hex, format!("Send error{}: {}", label, e)),
        };

        // A fatal error earlier in the batch drops the connection
        if !transport.is_connected() {
            let error = TcpHexError::NotConnected;
            return self.fail(index, hex, format!("Send error{}: {}", label, error));
        }

        if let Err(e) = transport.write(bytes).await {
            return self.fail(index, hex, format!("Send error{}: {}", label, e));
        }
        self.log
            .append(LogKind::Sent, format!("Sent: {}{}", hex, label));

        match transport.read_with_timeout(self.read_timeout).await {
            Ok(reply) if reply.is_empty() => {
                self.log.info(format!(
                    "No response received within {}ms{}",
                    self.read_timeout.as_millis(),
                    label
                ));
                ExchangeResult::answered(index, hex, String::new())
            }
            Ok(reply) => {
                let received = self.format.encode(&reply);
                self.log
                    .append(LogKind::Received, format!("Received: {}", received));
                ExchangeResult::answered(index, hex, received)
            }
            Err(e) => self.fail(index, hex, format!("Receive error{}: {}", label, e)),
        }
    }

    fn fail(&self, index: usize, hex: &str, message: String) -> ExchangeResult {
        self.log.error(message.clone());
        ExchangeResult::failed(index, hex, message)
    }
}

fn repeat_label(index: usize, total: u32) -> String {
    if total > 1 {
        format!(" (repeat {}/{})", index + 1, total)
    } else {
        String::new()
    }
}
