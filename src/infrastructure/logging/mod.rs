// Logging module - Logging infrastructure
use crate::domain::error::{TcpHexError, TcpHexResult};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Build the filter directive for the given configured level.
///
/// Unknown levels fall back to `info`. `verbose` forces `debug` for this
/// crate while keeping dependencies at the configured level.
pub fn filter_directive(level: &str, verbose: bool) -> String {
    let level = level.trim().to_ascii_lowercase();
    let level = if LEVELS.contains(&level.as_str()) {
        level
    } else {
        "info".to_string()
    };

    if verbose {
        format!("{},tcphex=debug", level)
    } else {
        format!("{},tcphex={}", level, level)
    }
}

/// Initialize logging system. `RUST_LOG` wins over the configured level.
pub fn init_logging(level: &str, verbose: bool) -> TcpHexResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level, verbose)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(verbose)
                .with_level(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(verbose),
        )
        .try_init()
        .map_err(|e| TcpHexError::Config {
            message: format!("Failed to initialize logging: {}", e),
        })?;

    tracing::debug!("tcphex logging system initialized");
    Ok(())
}
