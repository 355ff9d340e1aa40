use crate::domain::error::{TcpHexError, TcpHexResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// TcpHex configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpHexConfig {
    /// Client behaviour
    #[serde(default)]
    pub client: ClientConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Named hex commands
    #[serde(default = "default_presets")]
    pub presets: Vec<HexPreset>,
}

/// Settings for the exchange client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Connect timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Bound on a single payload write
    #[serde(default = "default_write_timeout")]
    pub write_timeout_ms: u64,
    /// How long to wait for a reply after each send
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
    /// Upper bound on bytes taken from a single reply read
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
    /// Activity log retention
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    /// Largest accepted repeat count for a send
    #[serde(default = "default_max_repeat_count")]
    pub max_repeat_count: u32,
    /// Render hex with a space between bytes
    #[serde(default)]
    pub spaced_hex: bool,
    /// Set TCP_NODELAY on new connections
    #[serde(default = "default_no_delay")]
    pub no_delay: bool,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// A named hex command offered to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HexPreset {
    pub name: String,
    #[serde(default = "default_preset_group")]
    pub group: String,
    pub code: String,
}

impl HexPreset {
    pub fn new(group: &str, name: &str, code: &str) -> Self {
        Self {
            name: name.to_string(),
            group: group.to_string(),
            code: code.to_string(),
        }
    }
}

// Default value functions
fn default_connect_timeout() -> u64 {
    5000
}

fn default_write_timeout() -> u64 {
    5000
}

fn default_read_timeout() -> u64 {
    2000
}

fn default_read_buffer_size() -> usize {
    1024
}

fn default_log_capacity() -> usize {
    100
}

fn default_max_repeat_count() -> u32 {
    100
}

fn default_no_delay() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_preset_group() -> String {
    "custom".to_string()
}

fn default_presets() -> Vec<HexPreset> {
    vec![
        HexPreset::new("relay", "relay1-on", "A0 01 01 A2"),
        HexPreset::new("relay", "relay1-off", "A0 01 00 A1"),
        HexPreset::new("relay", "relay2-on", "A0 02 01 A3"),
        HexPreset::new("relay", "relay2-off", "A0 02 00 A2"),
        HexPreset::new("common", "ping", "FF 00 00"),
        HexPreset::new("common", "status", "FF 01 00"),
        HexPreset::new("common", "reset", "FF 02 00"),
        HexPreset::new("common", "on", "01 01 01"),
        HexPreset::new("common", "off", "01 00 00"),
        HexPreset::new("common", "toggle", "01 02 00"),
    ]
}

impl Default for TcpHexConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            logging: LoggingConfig::default(),
            presets: default_presets(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            write_timeout_ms: default_write_timeout(),
            read_timeout_ms: default_read_timeout(),
            read_buffer_size: default_read_buffer_size(),
            log_capacity: default_log_capacity(),
            max_repeat_count: default_max_repeat_count(),
            spaced_hex: false,
            no_delay: default_no_delay(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Reject settings that would make the client unusable.
    pub fn validate(&self) -> TcpHexResult<()> {
        if self.connect_timeout_ms == 0 {
            return Err(config_error("connect_timeout_ms must be greater than zero"));
        }
        if self.write_timeout_ms == 0 {
            return Err(config_error("write_timeout_ms must be greater than zero"));
        }
        if self.read_timeout_ms == 0 {
            return Err(config_error("read_timeout_ms must be greater than zero"));
        }
        if self.read_buffer_size == 0 {
            return Err(config_error("read_buffer_size must be greater than zero"));
        }
        if self.log_capacity == 0 {
            return Err(config_error("log_capacity must be greater than zero"));
        }
        if self.max_repeat_count == 0 {
            return Err(config_error("max_repeat_count must be greater than zero"));
        }
        Ok(())
    }
}

impl TcpHexConfig {
    pub fn validate(&self) -> TcpHexResult<()> {
        self.client.validate()?;
        for preset in &self.presets {
            crate::core::codec::decode(&preset.code).map_err(|e| TcpHexError::Config {
                message: format!("Preset '{}' has an invalid code: {}", preset.name, e),
            })?;
        }
        Ok(())
    }

    /// Look up a preset by name, ignoring case.
    pub fn find_preset(&self, name: &str) -> Option<&HexPreset> {
        self.presets
            .iter()
            .find(|preset| preset.name.eq_ignore_ascii_case(name))
    }
}

fn config_error(message: &str) -> TcpHexError {
    TcpHexError::Config {
        message: message.to_string(),
    }
}
