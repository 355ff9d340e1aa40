use crate::core::activity::serialize_timestamp;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;

pub const MAX_RECENT_CONNECTIONS: usize = 10;

/// An address the shell connected to successfully
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentConnection {
    pub host: String,
    pub port: u16,
    #[serde(serialize_with = "serialize_timestamp")]
    pub last_used: DateTime<Local>,
}

impl RecentConnection {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// In-memory list of recent connections, newest first, without duplicates.
#[derive(Debug)]
pub struct RecentConnections {
    entries: VecDeque<RecentConnection>,
    capacity: usize,
}

impl Default for RecentConnections {
    fn default() -> Self {
        Self::new(MAX_RECENT_CONNECTIONS)
    }
}

impl RecentConnections {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Move `host:port` to the front, dropping the oldest entry when full.
    pub fn record(&mut self, host: &str, port: u16) {
        self.entries
            .retain(|entry| !(entry.port == port && entry.host.eq_ignore_ascii_case(host)));
        self.entries.push_front(RecentConnection {
            host: host.to_string(),
            port,
            last_used: Local::now(),
        });
        self.entries.truncate(self.capacity);
    }

    /// Entry by 1-based position, as listed by `history`
    pub fn get(&self, number: usize) -> Option<&RecentConnection> {
        number.checked_sub(1).and_then(|index| self.entries.get(index))
    }

    pub fn entries(&self) -> Vec<RecentConnection> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addresses(recent: &RecentConnections) -> Vec<String> {
        recent.entries().iter().map(RecentConnection::address).collect()
    }

    #[test]
    fn test_newest_first_without_duplicates() {
        let mut recent = RecentConnections::default();
        recent.record("10.0.0.1", 502);
        recent.record("10.0.0.2", 4001);
        recent.record("10.0.0.1", 502);

        assert_eq!(addresses(&recent), vec!["10.0.0.1:502", "10.0.0.2:4001"]);
        assert_eq!(recent.get(1).map(|c| c.port), Some(502));
        assert!(recent.get(0).is_none());
        assert!(recent.get(3).is_none());
    }

    #[test]
    fn test_bounded_to_capacity() {
        let mut recent = RecentConnections::default();
        for port in 1..=12 {
            recent.record("localhost", port);
        }

        assert_eq!(recent.len(), MAX_RECENT_CONNECTIONS);
        assert_eq!(recent.get(1).map(|c| c.port), Some(12));
        assert_eq!(recent.get(10).map(|c| c.port), Some(3));
    }

    #[test]
    fn test_same_host_different_port_is_distinct() {
        let mut recent = RecentConnections::new(5);
        recent.record("device.local", 80);
        recent.record("DEVICE.local", 80);
        recent.record("device.local", 81);

        assert_eq!(addresses(&recent), vec!["device.local:81", "DEVICE.local:80"]);
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut recent = RecentConnections::default();
        recent.record("127.0.0.1", 9000);

        let json = serde_json::to_value(recent.entries()).unwrap();
        assert_eq!(json[0]["host"], "127.0.0.1");
        assert_eq!(json[0]["port"], 9000);
        assert!(json[0]["lastUsed"].is_string());
    }
}
