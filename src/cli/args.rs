use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Command line arguments for tcphex
#[derive(Parser, Debug)]
#[command(
    name = "tcphex",
    version = env!("CARGO_PKG_VERSION"),
    about = "Send hex-encoded payloads to TCP devices and inspect the replies",
    long_about = "A TCP client for exchanging raw byte payloads, written as hex strings, with networked devices such as relay boards and controllers. Includes an interactive shell and a local echo/silent test server."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress diagnostics
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect, send a hex payload, print the replies and disconnect
    Exchange(ExchangeArgs),
    /// Interactive session reading commands from stdin
    Shell(ShellArgs),
    /// Run a local test server
    Serve(ServeArgs),
    /// Offline hex conversions
    Codec(CodecArgs),
    /// List configured hex presets
    Presets,
    /// Configuration management commands
    Config(ConfigArgs),
    /// Display version information
    Version,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
}

/// One-shot exchange arguments
#[derive(ClapArgs, Debug)]
pub struct ExchangeArgs {
    /// Server address or hostname
    pub host: String,
    /// Port number
    pub port: String,
    /// Payload as hex, whitespace allowed
    pub hex: String,
    /// Number of times to send the payload
    #[arg(short, long, default_value = "1")]
    pub repeat: u32,
    /// Print hex with a space between bytes
    #[arg(long)]
    pub spaced: bool,
}

/// Interactive shell arguments
#[derive(ClapArgs, Debug)]
pub struct ShellArgs {
    /// Connect to this host on start
    pub host: Option<String>,
    /// Port for the initial connection
    #[arg(requires = "host")]
    pub port: Option<String>,
}

/// Test server arguments
#[derive(ClapArgs, Debug)]
pub struct ServeArgs {
    /// Bind address
    #[arg(short, long, default_value = "127.0.0.1")]
    pub bind: String,
    /// Port number
    pub port: u16,
    /// Accept and read but never reply
    #[arg(long)]
    pub silent: bool,
}

/// Codec arguments
#[derive(ClapArgs, Debug)]
pub struct CodecArgs {
    /// Codec subcommand
    #[command(subcommand)]
    pub command: CodecCommand,
}

/// Configuration management arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Offline hex conversions
#[derive(Subcommand, Debug)]
pub enum CodecCommand {
    /// Encode text as hex
    Encode {
        /// Text whose UTF-8 bytes are encoded
        input: String,
        /// Separate bytes with spaces
        #[arg(long)]
        spaced: bool,
    },
    /// Decode hex and show the bytes
    Decode {
        /// Hex input, whitespace allowed
        input: String,
    },
    /// Canonicalise hex input
    Normalize {
        /// Hex input, whitespace allowed
        input: String,
        /// Separate bytes with spaces
        #[arg(long)]
        spaced: bool,
    },
}

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Validate configuration
    Validate {
        /// Configuration file path
        file: Option<String>,
    },
    /// Create default configuration
    Init {
        /// Directory for the project configuration
        #[arg(short, long)]
        output: Option<String>,
        /// Global configuration
        #[arg(short, long)]
        global: bool,
    },
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}
