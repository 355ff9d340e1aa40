use crate::core::activity::{serialize_optional_timestamp, serialize_timestamp, ActivityLog, LogEntry};
use crate::core::transport::Connection;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Point-in-time view of the client
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub connected: bool,
    /// `host:port`, only while connected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_info: Option<String>,
    #[serde(
        serialize_with = "serialize_optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_activity: Option<DateTime<Local>>,
    pub log: Vec<LogEntry>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub last_updated: DateTime<Local>,
}

/// Read-only view over the published connection state and the activity log.
///
/// Never waits on the client worker: the connection comes from a watch
/// channel and the log lock is only held for the copy.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    connection: watch::Receiver<Connection>,
    log: Arc<ActivityLog>,
}

impl StatusReporter {
    pub fn new(connection: watch::Receiver<Connection>, log: Arc<ActivityLog>) -> Self {
        Self { connection, log }
    }

    pub fn connection(&self) -> Connection {
        self.connection.borrow().clone()
    }

    pub fn status(&self) -> Status {
        let connection = self.connection();
        let connected = connection.is_connected();

        Status {
            connected,
            connection_info: connected.then(|| connection.address()),
            last_activity: if connected {
                connection.last_activity
            } else {
                None
            },
            log: self.log.snapshot(),
            last_updated: Local::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::ConnectionState;

    #[test]
    fn test_status_when_disconnected() {
        let (_tx, rx) = watch::channel(Connection::default());
        let log = Arc::new(ActivityLog::default());
        log.info("TCP client initialized");

        let status = StatusReporter::new(rx, log).status();
        assert!(!status.connected);
        assert!(status.connection_info.is_none());
        assert!(status.last_activity.is_none());
        assert_eq!(status.log.len(), 1);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["connected"], false);
        assert!(json.get("connectionInfo").is_none());
        assert!(json.get("lastActivity").is_none());
        assert_eq!(json["log"][0]["type"], "info");
        assert_eq!(json["lastUpdated"].as_str().unwrap().len(), 12);
    }

    #[test]
    fn test_status_follows_published_connection() {
        let (tx, rx) = watch::channel(Connection::default());
        let reporter = StatusReporter::new(rx, Arc::new(ActivityLog::default()));

        tx.send_replace(Connection {
            remote_host: "10.0.0.5".to_string(),
            remote_port: 502,
            state: ConnectionState::Connected,
            last_activity: Some(Local::now()),
        });

        let status = reporter.status();
        assert!(status.connected);
        assert_eq!(status.connection_info.as_deref(), Some("10.0.0.5:502"));
        assert!(status.last_activity.is_some());

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["connectionInfo"], "10.0.0.5:502");
        assert!(json["lastActivity"].is_string());
    }

    #[test]
    fn test_connecting_is_not_connected() {
        let (tx, rx) = watch::channel(Connection::default());
        let reporter = StatusReporter::new(rx, Arc::new(ActivityLog::default()));

        tx.send_modify(|connection| {
            connection.remote_host = "10.0.0.5".to_string();
            connection.state = ConnectionState::Connecting;
        });

        assert!(!reporter.status().connected);
        assert_eq!(reporter.connection().state, ConnectionState::Connecting);
    }
}
