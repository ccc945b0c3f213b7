//! Tool session capability and its three transport variants.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::{ServerConfig, TransportConfig, TransportKind};
use crate::error::BridgeError;

use super::schema::{PromptDescriptor, ToolDescriptor, ToolResult};

/// JSON object passed as tool arguments.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Uniform discovery/invocation interface over one tool backend.
///
/// All methods take `&self`: concurrent requests may use the same session,
/// and implementations serialize internally where the transport requires it.
#[async_trait]
pub trait ToolSession: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Open the connection and complete the MCP handshake.
    async fn start(&self) -> Result<(), BridgeError>;

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, BridgeError>;

    async fn list_prompts(&self) -> Result<Vec<PromptDescriptor>, BridgeError>;

    /// Invoke a tool. `timeout` bounds the whole call when set.
    async fn call_tool(
        &self,
        name: &str,
        arguments: JsonObject,
        timeout: Option<Duration>,
    ) -> Result<ToolResult, BridgeError>;

    /// Release the connection. Idempotent.
    async fn close(&self) -> Result<(), BridgeError>;
}

mod common;
mod container;
mod sse;
mod stdio;

pub use container::{container_run_args, ContainerSession};
pub use sse::SseSession;
pub use stdio::StdioSession;

/// Build the transport variant matching a server's configuration.
pub fn connect(name: &str, config: &ServerConfig) -> Box<dyn ToolSession> {
    match &config.transport {
        TransportConfig::Stdio(stdio) => Box::new(StdioSession::new(name, stdio.clone())),
        TransportConfig::Sse(sse) => Box::new(SseSession::new(name, sse.clone())),
        TransportConfig::Container(container) => {
            Box::new(ContainerSession::new(name, container.clone()))
        }
    }
}
