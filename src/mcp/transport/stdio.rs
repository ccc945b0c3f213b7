use std::time::Duration;

use async_trait::async_trait;
use rmcp::transport::ConfigureCommandExt;
use tokio::process::Command;

use crate::config::{StdioServerConfig, TransportKind};
use crate::error::BridgeError;
use crate::mcp::schema::{PromptDescriptor, ToolDescriptor, ToolResult};

use super::common::RmcpConnection;
use super::{JsonObject, ToolSession};

/// Stdio-based MCP session (for local MCP servers launched as subprocesses).
pub struct StdioSession {
    config: StdioServerConfig,
    connection: RmcpConnection,
}

impl StdioSession {
    pub fn new(name: impl Into<String>, config: StdioServerConfig) -> Self {
        Self {
            config,
            connection: RmcpConnection::new(name),
        }
    }

    pub fn config(&self) -> &StdioServerConfig {
        &self.config
    }

    fn command(&self) -> Command {
        Command::new(&self.config.command).configure(|cmd| {
            cmd.args(&self.config.args)
                .envs(self.config.env.iter())
                .stderr(std::process::Stdio::inherit());
            if let Some(cwd) = &self.config.cwd {
                cmd.current_dir(cwd);
            }
        })
    }
}

#[async_trait]
impl ToolSession for StdioSession {
    fn kind(&self) -> TransportKind {
        TransportKind::Stdio
    }

    async fn start(&self) -> Result<(), BridgeError> {
        if self.connection.is_started().await {
            return Ok(());
        }
        tracing::debug!(
            server = %self.connection.server(),
            command = %self.config.command,
            "Starting stdio MCP server"
        );
        self.connection.serve_child_process(self.command()).await
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, BridgeError> {
        self.connection.list_tools().await
    }

    async fn list_prompts(&self) -> Result<Vec<PromptDescriptor>, BridgeError> {
        self.connection.list_prompts().await
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: JsonObject,
        timeout: Option<Duration>,
    ) -> Result<ToolResult, BridgeError> {
        self.connection.call_tool(name, arguments, timeout).await
    }

    async fn close(&self) -> Result<(), BridgeError> {
        self.connection.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::ffi::OsStr;

    fn config() -> StdioServerConfig {
        StdioServerConfig {
            command: "uvx".into(),
            args: vec!["mcp-server-fetch".into(), "--ignore-robots-txt".into()],
            env: BTreeMap::from([("FETCH_UA".to_string(), "bridge".to_string())]),
            cwd: Some("/tmp".into()),
        }
    }

    #[test]
    fn command_carries_args_env_and_cwd() {
        let session = StdioSession::new("fetch", config());
        let command = session.command();
        let std_command = command.as_std();

        assert_eq!(std_command.get_program(), OsStr::new("uvx"));
        let args: Vec<_> = std_command.get_args().collect();
        assert_eq!(
            args,
            vec![OsStr::new("mcp-server-fetch"), OsStr::new("--ignore-robots-txt")]
        );
        let envs: Vec<_> = std_command.get_envs().collect();
        assert!(envs.contains(&(OsStr::new("FETCH_UA"), Some(OsStr::new("bridge")))));
        assert_eq!(std_command.get_current_dir(), Some(std::path::Path::new("/tmp")));
    }

    #[tokio::test]
    async fn start_fails_for_missing_binary() {
        let mut config = config();
        config.command = "mcp-bridge-test-no-such-binary".into();
        config.cwd = None;
        let session = StdioSession::new("fetch", config);
        assert!(session.start().await.is_err());
        assert!(session.list_tools().await.is_err());
    }

    #[tokio::test]
    async fn close_is_idempotent_without_connection() {
        let session = StdioSession::new("fetch", config());
        assert!(session.close().await.is_ok());
        assert!(session.close().await.is_ok());
    }
}
