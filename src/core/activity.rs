use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info};

/// Display format for every timestamp the client reports.
pub const TIMESTAMP_FORMAT: &str = "%H:%M:%S%.3f";

/// Default number of entries kept by the activity log
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Format a timestamp as `HH:MM:SS.mmm`.
pub fn format_timestamp(timestamp: &DateTime<Local>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn serialize_timestamp<S: Serializer>(
    timestamp: &DateTime<Local>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(timestamp))
}

pub(crate) fn serialize_optional_timestamp<S: Serializer>(
    timestamp: &Option<DateTime<Local>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match timestamp {
        Some(ts) => serialize_timestamp(ts, serializer),
        None => serializer.serialize_none(),
    }
}

/// Log entry classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Error,
    Sent,
    Received,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogKind::Info => write!(f, "info"),
            LogKind::Error => write!(f, "error"),
            LogKind::Sent => write!(f, "sent"),
            LogKind::Received => write!(f, "received"),
        }
    }
}

/// A single activity record. Never modified after creation.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    #[serde(serialize_with = "serialize_timestamp")]
    timestamp: DateTime<Local>,
    #[serde(rename = "type")]
    kind: LogKind,
    message: String,
}

impl LogEntry {
    fn new(kind: LogKind, message: String) -> Self {
        Self {
            timestamp: Local::now(),
            kind,
            message,
        }
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn kind(&self) -> LogKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            format_timestamp(&self.timestamp),
            self.kind,
            self.message
        )
    }
}

/// Bounded, insertion-ordered log of client activity.
///
/// Appends and snapshots are serialised by a mutex that is only held for
/// the push or the copy, so readers never wait on socket I/O.
#[derive(Debug)]
pub struct ActivityLog {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl ActivityLog {
    /// Create a log holding at most `capacity` entries (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Record an event, evicting the oldest entry when full.
    pub fn append(&self, kind: LogKind, message: impl Into<String>) {
        let entry = LogEntry::new(kind, message.into());

        match kind {
            LogKind::Error => error!("{}", entry.message),
            LogKind::Info => info!("{}", entry.message),
            LogKind::Sent | LogKind::Received => debug!("{}: {}", kind, entry.message),
        }

        let mut entries = self.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.append(LogKind::Info, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.append(LogKind::Error, message);
    }

    /// Copy of the current entries, oldest first.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
