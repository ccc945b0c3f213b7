use std::time::Duration;

use async_trait::async_trait;
use rmcp::transport::ConfigureCommandExt;
use tokio::process::Command;

use crate::config::{ContainerServerConfig, TransportKind};
use crate::error::BridgeError;
use crate::mcp::schema::{PromptDescriptor, ToolDescriptor, ToolResult};

use super::common::RmcpConnection;
use super::{JsonObject, ToolSession};

/// MCP session over `docker|podman run -i` with the server's stdio attached.
pub struct ContainerSession {
    config: ContainerServerConfig,
    connection: RmcpConnection,
}

impl ContainerSession {
    pub fn new(name: impl Into<String>, config: ContainerServerConfig) -> Self {
        Self {
            config,
            connection: RmcpConnection::new(name),
        }
    }

    pub fn config(&self) -> &ContainerServerConfig {
        &self.config
    }

    fn command(&self) -> Command {
        let args = container_run_args(&self.config);
        Command::new(self.config.runtime.as_ref()).configure(|cmd| {
            cmd.args(&args).stderr(std::process::Stdio::inherit());
        })
    }
}

/// Arguments for the container runtime CLI, starting at `run`.
pub fn container_run_args(config: &ContainerServerConfig) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "-i".to_string(), // MCP speaks over stdin/stdout
        "--rm".to_string(),
    ];

    if let Some(name) = &config.container_name {
        args.push("--name".to_string());
        args.push(name.clone());
    }

    if let Some(network) = &config.network {
        args.push("--network".to_string());
        args.push(network.clone());
    }

    for (key, value) in &config.env {
        args.push("-e".to_string());
        args.push(format!("{key}={value}"));
    }

    for volume in &config.volumes {
        args.push("-v".to_string());
        args.push(volume.clone());
    }

    args.push(config.image.clone());
    args.extend(config.args.iter().cloned());
    args
}

#[async_trait]
impl ToolSession for ContainerSession {
    fn kind(&self) -> TransportKind {
        TransportKind::Container
    }

    async fn start(&self) -> Result<(), BridgeError> {
        if self.connection.is_started().await {
            return Ok(());
        }
        tracing::debug!(
            server = %self.connection.server(),
            runtime = %self.config.runtime,
            image = %self.config.image,
            "Starting containerized MCP server"
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
    use crate::config::ContainerRuntime;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::ffi::OsStr;

    #[test]
    fn minimal_run_args() {
        let config = ContainerServerConfig {
            image: "mcp/time".into(),
            ..Default::default()
        };
        assert_eq!(container_run_args(&config), vec!["run", "-i", "--rm", "mcp/time"]);
    }

    #[test]
    fn full_run_args_keep_image_before_server_args() {
        let config = ContainerServerConfig {
            image: "mcp/fetch:latest".into(),
            args: vec!["--verbose".into()],
            env: BTreeMap::from([
                ("B".to_string(), "2".to_string()),
                ("A".to_string(), "1".to_string()),
            ]),
            volumes: vec!["/data:/data:ro".into()],
            network: Some("host".into()),
            container_name: Some("bridge-fetch".into()),
            runtime: ContainerRuntime::Podman,
        };
        assert_eq!(
            container_run_args(&config),
            vec![
                "run",
                "-i",
                "--rm",
                "--name",
                "bridge-fetch",
                "--network",
                "host",
                "-e",
                "A=1",
                "-e",
                "B=2",
                "-v",
                "/data:/data:ro",
                "mcp/fetch:latest",
                "--verbose",
            ]
        );
    }

    #[test]
    fn command_uses_configured_runtime() {
        let session = ContainerSession::new(
            "time",
            ContainerServerConfig {
                image: "mcp/time".into(),
                runtime: ContainerRuntime::Podman,
                ..Default::default()
            },
        );
        let command = session.command();
        assert_eq!(command.as_std().get_program(), OsStr::new("podman"));
        assert_eq!(command.as_std().get_args().next(), Some(OsStr::new("run")));
    }
}
