use crate::cli::args::{
    Args, CodecCommand, Command, ConfigCommand, ExchangeArgs, ServeArgs, ShellArgs,
};
use crate::cli::history::RecentConnections;
use crate::cli::output::{ConsoleWriter, ExchangeReport, OutputWriter};
use crate::core::client::HexClient;
use crate::core::codec;
use crate::domain::config::TcpHexConfig;
use crate::domain::error::{TcpHexError, TcpHexResult};
use crate::domain::validation::{validate_host, validate_port};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::tcp::{ServerMode, TestServer};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// Execute CLI command
pub async fn execute_command(args: Args) -> TcpHexResult<ExitCode> {
    // Load configuration using ConfigManager
    let config_manager = ConfigManager::new()?;
    let config = config_manager.load_config_with(args.config.as_deref().map(Path::new))?;

    // Initialize logging
    if !args.quiet {
        init_logging(&config.logging.level, args.verbose)?;
    }

    let writer = ConsoleWriter::new(args.output).with_spaced_hex(config.client.spaced_hex);

    match args.command {
        Command::Exchange(exchange_args) => execute_exchange(exchange_args, writer, &config).await,
        Command::Shell(shell_args) => execute_shell(shell_args, &writer, &config).await,
        Command::Serve(serve_args) => execute_serve(serve_args, &writer).await,
        Command::Codec(codec_args) => {
            execute_codec_command(codec_args.command, &writer)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Presets => {
            writer.write_presets(&config.presets)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Config(config_args) => {
            execute_config_command(config_args.command, &writer, &config, &config_manager)
        }
        Command::Version => {
            writer.write_message(&format!("tcphex {}", env!("CARGO_PKG_VERSION")))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn execute_exchange(
    args: ExchangeArgs,
    writer: ConsoleWriter,
    config: &TcpHexConfig,
) -> TcpHexResult<ExitCode> {
    validate_host(&args.host)?;
    let port = validate_port(&args.port)?;
    codec::decode(&args.hex)?;

    let writer = writer.with_spaced_hex(args.spaced || config.client.spaced_hex);
    let client = HexClient::new(&config.client);

    let connect = client.connect(&args.host, port).await?;
    if !connect.connected {
        let report = ExchangeReport {
            connect,
            send: None,
            log: client.log().snapshot(),
        };
        client.shutdown().await?;
        writer.write_exchange(&report)?;
        return Ok(ExitCode::FAILURE);
    }

    let send = client.send(&args.hex, args.repeat).await;
    let disconnect = client.disconnect().await?;
    if let Some(error) = &disconnect.error {
        warn!("{}", error);
    }
    let log = client.log().snapshot();
    client.shutdown().await?;

    let send = send?;
    let failed = send.errors.is_some();
    writer.write_exchange(&ExchangeReport {
        connect,
        send: Some(send),
        log,
    })?;

    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

/// A parsed line of the interactive shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Connect { host: String, port: String },
    /// Reconnect to an entry of `history`, numbered from 1
    ConnectRecent(usize),
    History,
    Send { hex: String, repeat_count: u32 },
    Preset { name: String, repeat_count: u32 },
    Status,
    Disconnect,
    Help,
    Quit,
    Empty,
}

const SHELL_HELP: &str = "Commands:
  connect <host> <port>    open a connection, replacing any current one
  connect <n>              reconnect to entry n of history
  history                  list recent connections, newest first
  send <hex> [xN]          send hex bytes, e.g. send A0 01 01 A2 x3
  preset <name> [xN]       send a configured preset
  status                   show connection state and activity log
  disconnect               close the connection
  help                     show this help
  quit                     disconnect and exit";

/// Parse one shell line.
///
/// `send` takes the rest of the line as hex, so bytes may be separated by
/// spaces. A trailing `xN` token sets the repeat count.
pub fn parse_shell_line(line: &str) -> TcpHexResult<ShellCommand> {
    let line = line.trim();
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command.to_ascii_lowercase().as_str() {
        "" => Ok(ShellCommand::Empty),
        "connect" => {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            match parts.as_slice() {
                [host, port] => Ok(ShellCommand::Connect {
                    host: host.to_string(),
                    port: port.to_string(),
                }),
                [target] => {
                    if let Ok(number) = target.parse::<usize>() {
                        return Ok(ShellCommand::ConnectRecent(number));
                    }
                    match target.rsplit_once(':') {
                        Some((host, port)) if !host.contains(':') => Ok(ShellCommand::Connect {
                            host: host.to_string(),
                            port: port.to_string(),
                        }),
                        _ => Err(TcpHexError::MissingParameter("port")),
                    }
                }
                [] => Err(TcpHexError::MissingParameter("ipAddress")),
                _ => Err(TcpHexError::InvalidInput("usage: connect <host> <port>".to_string())),
            }
        }
        "send" => {
            let (hex, repeat_count) = split_repeat(rest)?;
            if hex.is_empty() {
                return Err(TcpHexError::MissingParameter("hexCode"));
            }
            Ok(ShellCommand::Send {
                hex: hex.to_string(),
                repeat_count,
            })
        }
        "preset" => {
            let (name, repeat_count) = split_repeat(rest)?;
            if name.is_empty() {
                return Err(TcpHexError::InvalidInput("usage: preset <name> [xN]".to_string()));
            }
            Ok(ShellCommand::Preset {
                name: name.to_string(),
                repeat_count,
            })
        }
        "status" => Ok(ShellCommand::Status),
        "history" => Ok(ShellCommand::History),
        "disconnect" => Ok(ShellCommand::Disconnect),
        "help" | "?" => Ok(ShellCommand::Help),
        "quit" | "exit" => Ok(ShellCommand::Quit),
        other => Err(TcpHexError::InvalidInput(format!(
            "unknown command '{}', type 'help'",
            other
        ))),
    }
}

fn split_repeat(rest: &str) -> TcpHexResult<(&str, u32)> {
    match rest.rsplit_once(char::is_whitespace) {
        Some((head, last)) if last.len() > 1 && last.starts_with(|c| c == 'x' || c == 'X') => {
            let count = last[1..].parse::<u32>().map_err(|_| {
                TcpHexError::InvalidInput(format!("invalid repeat count '{}'", last))
            })?;
            Ok((head.trim(), count))
        }
        _ => Ok((rest, 1)),
    }
}

async fn execute_shell(
    args: ShellArgs,
    writer: &ConsoleWriter,
    config: &TcpHexConfig,
) -> TcpHexResult<ExitCode> {
    let client = HexClient::new(&config.client);
    let mut recent = RecentConnections::default();

    if let (Some(host), Some(port)) = (args.host, args.port) {
        let command = ShellCommand::Connect { host, port };
        run_shell_command(&client, writer, config, &mut recent, command).await?;
    } else {
        writer.write_message("Type 'help' for commands")?;
    }

    let stdin = BufReader::new(tokio::io::stdin());
    run_shell(&client, writer, config, &mut recent, stdin).await?;

    client.shutdown().await?;
    Ok(ExitCode::SUCCESS)
}

/// Drive the shell from `input` until end of input or `quit`.
///
/// Successful connects are recorded in `recent`.
pub async fn run_shell<R>(
    client: &HexClient,
    writer: &dyn OutputWriter,
    config: &TcpHexConfig,
    recent: &mut RecentConnections,
    input: R,
) -> TcpHexResult<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        let command = match parse_shell_line(&line) {
            Ok(command) => command,
            Err(e) => {
                writer.write_error(&e.to_string())?;
                continue;
            }
        };
        if command == ShellCommand::Quit {
            break;
        }

        if let Err(e) = run_shell_command(client, writer, config, recent, command).await {
            match e {
                TcpHexError::WorkerStopped => return Err(e),
                e => writer.write_error(&e.to_string())?,
            }
        }
    }

    debug!("Shell input finished");
    Ok(())
}

async fn run_shell_command(
    client: &HexClient,
    writer: &dyn OutputWriter,
    config: &TcpHexConfig,
    recent: &mut RecentConnections,
    command: ShellCommand,
) -> TcpHexResult<()> {
    match command {
        ShellCommand::Connect { host, port } => {
            validate_host(&host)?;
            let port = validate_port(&port)?;
            shell_connect(client, writer, recent, &host, port).await?;
        }
        ShellCommand::ConnectRecent(number) => {
            let target = recent.get(number).cloned().ok_or_else(|| {
                TcpHexError::InvalidInput(format!(
                    "no recent connection #{} ({} saved)",
                    number,
                    recent.len()
                ))
            })?;
            shell_connect(client, writer, recent, &target.host, target.port).await?;
        }
        ShellCommand::History => writer.write_recent(&recent.entries())?,
        ShellCommand::Send { hex, repeat_count } => {
            let response = client.send(&hex, repeat_count).await?;
            writer.write_send(&response)?;
        }
        ShellCommand::Preset { name, repeat_count } => {
            let preset = config.find_preset(&name).ok_or_else(|| {
                TcpHexError::InvalidInput(format!("no preset named '{}'", name))
            })?;
            let response = client.send(&preset.code, repeat_count).await?;
            writer.write_send(&response)?;
        }
        ShellCommand::Status => writer.write_status(&client.status())?,
        ShellCommand::Disconnect => {
            let response = client.disconnect().await?;
            writer.write_disconnect(&response)?;
        }
        ShellCommand::Help => writer.write_message(SHELL_HELP)?,
        ShellCommand::Quit | ShellCommand::Empty => {}
    }
    Ok(())
}

async fn shell_connect(
    client: &HexClient,
    writer: &dyn OutputWriter,
    recent: &mut RecentConnections,
    host: &str,
    port: u16,
) -> TcpHexResult<()> {
    let response = client.connect(host, port).await?;
    if response.connected {
        recent.record(host, port);
    }
    writer.write_connect(&response)?;
    Ok(())
}

async fn execute_serve(args: ServeArgs, writer: &ConsoleWriter) -> TcpHexResult<ExitCode> {
    let mode = if args.silent {
        ServerMode::Silent
    } else {
        ServerMode::Echo
    };

    let mut server = TestServer::bind(&format!("{}:{}", args.bind, args.port), mode).await?;
    server.start()?;
    writer.write_message(&format!(
        "{} server listening on {} (Press Ctrl+C to stop)",
        mode,
        server.local_addr()
    ))?;

    tokio::signal::ctrl_c().await?;

    let stats = server.stats().await;
    server.shutdown().await?;
    writer.write_message(&format!(
        "Server stopped: {} bytes received, {} bytes sent by {} open connections",
        stats.total_bytes_received, stats.total_bytes_sent, stats.client_count
    ))?;
    Ok(ExitCode::SUCCESS)
}

fn execute_codec_command(command: CodecCommand, writer: &ConsoleWriter) -> TcpHexResult<()> {
    match command {
        CodecCommand::Encode { input, spaced } => {
            let hex = codec::HexFormat::new(spaced).encode(input.as_bytes());
            writer.write_message(&hex)?;
        }
        CodecCommand::Decode { input } => {
            let bytes = codec::decode(&input)?;
            writer.write_bytes(&codec::encode(&bytes), &bytes)?;
        }
        CodecCommand::Normalize { input, spaced } => {
            let bytes = codec::decode(&input)?;
            writer.write_message(&codec::HexFormat::new(spaced).encode(&bytes))?;
        }
    }
    Ok(())
}

fn execute_config_command(
    command: ConfigCommand,
    writer: &ConsoleWriter,
    config: &TcpHexConfig,
    config_manager: &ConfigManager,
) -> TcpHexResult<ExitCode> {
    match command {
        ConfigCommand::Show => {
            writer.write_config(config)?;
        }
        ConfigCommand::Validate { file } => {
            let result = match &file {
                Some(config_path) => config_manager
                    .load_config_from_path(config_path.as_ref())
                    .and_then(|config| config.validate()),
                None => config_manager.load_config().map(|_| ()),
            };

            let target = file
                .map(|path| format!("Configuration file '{}'", path))
                .unwrap_or_else(|| "Current configuration".to_string());
            match result {
                Ok(()) => writer.write_message(&format!("{} is valid", target))?,
                Err(e) => {
                    writer.write_error(&format!("Configuration validation failed: {}", e))?;
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        ConfigCommand::Init { output, global } => {
            let path = if global {
                config_manager.init_global_config()?
            } else {
                let dir = match output {
                    Some(dir) => PathBuf::from(dir),
                    None => std::env::current_dir().map_err(|e| TcpHexError::Config {
                        message: format!("Failed to get current directory: {}", e),
                    })?,
                };
                config_manager.init_project_config(&dir)?
            };
            writer.write_message(&format!("Configuration initialized at '{}'", path.display()))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
