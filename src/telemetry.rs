//! Logging initialization.

use tracing_subscriber::EnvFilter;

use crate::config::{LogLevel, LoggingConfig};

/// Default filter directives for a configured level.
pub fn default_filter(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Debug => "mcp_bridge=debug,rmcp=info,tower_http=debug",
        LogLevel::Info => "mcp_bridge=info,tower_http=info",
    }
}

/// Install the global fmt subscriber. `RUST_LOG` overrides the configured level.
///
/// Calling this twice is harmless; the second install is ignored.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(config.log_level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
