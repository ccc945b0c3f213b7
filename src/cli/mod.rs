//! Command-line interface for the gateway binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{BridgeConfig, LogLevel};
use crate::error::BridgeError;

#[derive(Parser, Debug)]
#[command(name = "mcp-bridge", version, about = "OpenAI-compatible gateway for MCP tools")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Configuration file (JSON or TOML)
    #[arg(short, long, env = "MCP_BRIDGE__CONFIG_FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (info, debug)
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Bind address
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Bind port
    #[arg(short, long, global = true)]
    pub port: Option<u16>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP gateway (default)
    Serve,
    /// Start the configured MCP servers, print what a model can see, then exit
    Tools(ToolsArgs),
}

#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Model whose policy filters the listing
    #[arg(short, long)]
    pub model: Option<String>,
}

impl Cli {
    /// Load configuration and apply the flags that override it.
    pub fn load_config(&self) -> Result<BridgeConfig, BridgeError> {
        let mut config = BridgeConfig::load(self.global.config.as_deref())?;
        self.global.apply(&mut config);
        Ok(config)
    }
}

impl GlobalArgs {
    /// Flags beat file and environment values.
    pub fn apply(&self, config: &mut BridgeConfig) {
        if let Some(level) = self.log_level {
            config.logging.log_level = level;
        }
        if let Some(host) = &self.host {
            config.network.host = host.clone();
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
    }
}
