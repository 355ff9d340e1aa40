use crate::cli::args::OutputFormat;
use crate::cli::history::RecentConnection;
use crate::core::activity::{format_timestamp, LogEntry};
use crate::core::codec;
use crate::core::response::{ConnectResponse, DisconnectResponse, SendResponse};
use crate::core::status::Status;
use crate::domain::config::{HexPreset, TcpHexConfig};
use serde::Serialize;
use std::io;
use tabled::{Table, Tabled};

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_connect(&self, response: &ConnectResponse) -> Result<(), OutputError>;
    fn write_disconnect(&self, response: &DisconnectResponse) -> Result<(), OutputError>;
    fn write_send(&self, response: &SendResponse) -> Result<(), OutputError>;
    fn write_exchange(&self, report: &ExchangeReport) -> Result<(), OutputError>;
    fn write_status(&self, status: &Status) -> Result<(), OutputError>;
    fn write_log(&self, entries: &[LogEntry]) -> Result<(), OutputError>;
    fn write_presets(&self, presets: &[HexPreset]) -> Result<(), OutputError>;
    fn write_recent(&self, recent: &[RecentConnection]) -> Result<(), OutputError>;
    fn write_config(&self, config: &TcpHexConfig) -> Result<(), OutputError>;
    fn write_bytes(&self, hex: &str, bytes: &[u8]) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
    fn write_error(&self, error: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("TOML serialization error: {0}")]
    TomlError(#[from] toml::ser::Error),
}

impl From<OutputError> for crate::domain::error::TcpHexError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Everything a one-shot exchange produced
#[derive(Debug, Serialize)]
pub struct ExchangeReport {
    pub connect: ConnectResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send: Option<SendResponse>,
    pub log: Vec<LogEntry>,
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
    spaced: bool,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            spaced: false,
        }
    }

    /// Render hex in text and table output with a space between bytes
    pub fn with_spaced_hex(mut self, spaced: bool) -> Self {
        self.spaced = spaced;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn display_hex(&self, hex: &str) -> String {
        if self.spaced {
            codec::format_spaced(hex)
        } else {
            hex.to_string()
        }
    }

    fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), OutputError> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

impl OutputWriter for ConsoleWriter {
    fn write_connect(&self, response: &ConnectResponse) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => self.print_json(response)?,
            _ => match &response.error {
                None => println!("Connected"),
                Some(error) => eprintln!("{}", error),
            },
        }
        Ok(())
    }

    fn write_disconnect(&self, response: &DisconnectResponse) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => self.print_json(response)?,
            _ => match &response.error {
                None => println!("Disconnected"),
                Some(error) => eprintln!("{}", error),
            },
        }
        Ok(())
    }

    fn write_send(&self, response: &SendResponse) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                for row in exchange_rows(response) {
                    match row.outcome.as_str() {
                        "ok" => println!(
                            "[{}] sent {} -> received {}",
                            row.index,
                            self.display_hex(&row.sent),
                            self.display_hex(&row.received)
                        ),
                        "silent" => println!(
                            "[{}] sent {} -> no response",
                            row.index,
                            self.display_hex(&row.sent)
                        ),
                        _ => println!("[{}] {}", row.index, row.received),
                    }
                }
                println!(
                    "{} of {} exchanges succeeded",
                    response.success_count(),
                    response.total()
                );
            }
            OutputFormat::Json => self.print_json(response)?,
            OutputFormat::Table => {
                let rows: Vec<ExchangeRow> = exchange_rows(response)
                    .into_iter()
                    .map(|mut row| {
                        row.sent = self.display_hex(&row.sent);
                        if row.outcome != "error" {
                            row.received = self.display_hex(&row.received);
                        }
                        row
                    })
                    .collect();
                println!("{}", Table::new(rows));
            }
        }
        Ok(())
    }

    fn write_exchange(&self, report: &ExchangeReport) -> Result<(), OutputError> {
        if self.format == OutputFormat::Json {
            return self.print_json(report);
        }

        self.write_connect(&report.connect)?;
        if let Some(send) = &report.send {
            self.write_send(send)?;
        }
        if !report.log.is_empty() {
            println!();
            println!("Activity log:");
            self.write_log(&report.log)?;
        }
        Ok(())
    }

    fn write_status(&self, status: &Status) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => self.print_json(status)?,
            _ => {
                match &status.connection_info {
                    Some(info) if status.connected => println!("Status: connected to {}", info),
                    _ => println!("Status: disconnected"),
                }
                if let Some(last_activity) = &status.last_activity {
                    println!("Last activity: {}", format_timestamp(last_activity));
                }
                println!("Updated: {}", format_timestamp(&status.last_updated));
                self.write_log(&status.log)?;
            }
        }
        Ok(())
    }

    fn write_log(&self, entries: &[LogEntry]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                for entry in entries {
                    println!("{}", entry);
                }
            }
            OutputFormat::Json => self.print_json(entries)?,
            OutputFormat::Table => {
                if !entries.is_empty() {
                    let rows: Vec<LogRow> = entries.iter().map(LogRow::from).collect();
                    println!("{}", Table::new(rows));
                }
            }
        }
        Ok(())
    }

    fn write_presets(&self, presets: &[HexPreset]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                let mut group = None;
                for preset in presets {
                    if group != Some(&preset.group) {
                        println!("{}:", preset.group);
                        group = Some(&preset.group);
                    }
                    println!("  {:<16} {}", preset.name, preset.code);
                }
            }
            OutputFormat::Json => self.print_json(presets)?,
            OutputFormat::Table => {
                if !presets.is_empty() {
                    let rows: Vec<PresetRow> = presets.iter().map(PresetRow::from).collect();
                    println!("{}", Table::new(rows));
                }
            }
        }
        Ok(())
    }

    fn write_recent(&self, recent: &[RecentConnection]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                if recent.is_empty() {
                    println!("No recent connections");
                }
                for (number, connection) in recent.iter().enumerate() {
                    println!(
                        "  {:>2}. {:<24} {}",
                        number + 1,
                        connection.address(),
                        format_timestamp(&connection.last_used)
                    );
                }
            }
            OutputFormat::Json => self.print_json(recent)?,
            OutputFormat::Table => {
                if !recent.is_empty() {
                    let rows: Vec<RecentRow> = recent
                        .iter()
                        .enumerate()
                        .map(|(index, connection)| RecentRow {
                            number: index + 1,
                            address: connection.address(),
                            last_used: format_timestamp(&connection.last_used),
                        })
                        .collect();
                    println!("{}", Table::new(rows));
                }
            }
        }
        Ok(())
    }

    fn write_config(&self, config: &TcpHexConfig) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                let client = &config.client;
                println!("tcphex Configuration:");
                println!("  Log level: {}", config.logging.level);
                println!("  Connect timeout: {}ms", client.connect_timeout_ms);
                println!("  Write timeout: {}ms", client.write_timeout_ms);
                println!("  Read timeout: {}ms", client.read_timeout_ms);
                println!("  Read buffer: {} bytes", client.read_buffer_size);
                println!("  Log capacity: {}", client.log_capacity);
                println!("  Max repeat count: {}", client.max_repeat_count);
                println!("  Spaced hex: {}", client.spaced_hex);
                println!("  TCP_NODELAY: {}", client.no_delay);
                println!("  Presets: {}", config.presets.len());
            }
            OutputFormat::Json => self.print_json(config)?,
            OutputFormat::Table => {
                println!("{}", toml::to_string_pretty(config)?);
            }
        }
        Ok(())
    }

    fn write_bytes(&self, hex: &str, bytes: &[u8]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "hex": hex,
                    "bytes": bytes,
                    "length": bytes.len(),
                });
                self.print_json(&output)?;
            }
            _ => {
                println!("{}", self.display_hex(hex));
                println!("{} bytes", bytes.len());
                let ascii: String = bytes
                    .iter()
                    .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
                    .collect();
                println!("ASCII: {}", ascii);
            }
        }
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "message": message,
                    "level": "info"
                });
                self.print_json(&output)?;
            }
            _ => {
                println!("{}", message);
            }
        }
        Ok(())
    }

    fn write_error(&self, error: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "error": error,
                    "level": "error"
                });
                eprintln!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                eprintln!("Error: {}", error);
            }
        }
        Ok(())
    }
}

/// Table row for a single exchange iteration
#[derive(Tabled, Debug, PartialEq)]
struct ExchangeRow {
    index: usize,
    outcome: String,
    sent: String,
    received: String,
}

fn exchange_rows(response: &SendResponse) -> Vec<ExchangeRow> {
    let mut rows: Vec<ExchangeRow> = response
        .success
        .iter()
        .map(|(index, reply)| ExchangeRow {
            index: *index,
            outcome: if reply.received.is_empty() { "silent" } else { "ok" }.to_string(),
            sent: reply.sent.clone(),
            received: reply.received.clone(),
        })
        .collect();

    if let Some(errors) = &response.errors {
        rows.extend(errors.iter().map(|(index, error)| ExchangeRow {
            index: *index,
            outcome: "error".to_string(),
            sent: String::new(),
            received: error.clone(),
        }));
    }

    rows.sort_by_key(|row| row.index);
    rows
}

/// Table row for an activity log entry
#[derive(Tabled)]
struct LogRow {
    time: String,
    r#type: String,
    message: String,
}

impl From<&LogEntry> for LogRow {
    fn from(entry: &LogEntry) -> Self {
        Self {
            time: format_timestamp(&entry.timestamp()),
            r#type: entry.kind().to_string(),
            message: entry.message().to_string(),
        }
    }
}

/// Table row for a hex preset
#[derive(Tabled)]
struct PresetRow {
    group: String,
    name: String,
    code: String,
}

impl From<&HexPreset> for PresetRow {
    fn from(preset: &HexPreset) -> Self {
        Self {
            group: preset.group.clone(),
            name: preset.name.clone(),
            code: preset.code.clone(),
        }
    }
}

/// Table row for a recent connection
#[derive(Tabled)]
struct RecentRow {
    number: usize,
    address: String,
    last_used: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::response::ExchangeReply;
    use std::collections::BTreeMap;

    #[test]
    fn test_exchange_rows_are_ordered_by_index() {
        let mut success = BTreeMap::new();
        success.insert(
            0,
            ExchangeReply {
                sent: "0102".to_string(),
                received: "AA".to_string(),
            },
        );
        success.insert(
            2,
            ExchangeReply {
                sent: "0102".to_string(),
                received: String::new(),
            },
        );
        let mut errors = BTreeMap::new();
        errors.insert(1, "Receive error (repeat 2/3): reset".to_string());

        let rows = exchange_rows(&SendResponse {
            success,
            errors: Some(errors),
        });

        let outcomes: Vec<&str> = rows.iter().map(|r| r.outcome.as_str()).collect();
        assert_eq!(outcomes, vec!["ok", "error", "silent"]);
        assert_eq!(rows[1].received, "Receive error (repeat 2/3): reset");
    }

    #[test]
    fn test_display_hex_spacing() {
        let writer = ConsoleWriter::new(OutputFormat::Text);
        assert_eq!(writer.display_hex("A00101A2"), "A00101A2");

        let writer = writer.with_spaced_hex(true);
        assert_eq!(writer.display_hex("A00101A2"), "A0 01 01 A2");
        assert_eq!(writer.format(), OutputFormat::Text);
    }

    #[test]
    fn test_output_error_conversion() {
        let err: crate::domain::error::TcpHexError =
            OutputError::IoError(io::Error::new(io::ErrorKind::BrokenPipe, "closed")).into();
        assert!(err.to_string().contains("closed"));
    }
}
