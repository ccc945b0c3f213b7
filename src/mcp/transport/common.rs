//! rmcp client connection shared by all transport variants.

use std::time::Duration;

use rmcp::model::CallToolRequestParam;
use rmcp::service::{Peer, RoleClient, RunningService, ServiceError};
use rmcp::transport::TokioChildProcess;
use rmcp::ServiceExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::process::Command;
use tokio::sync::RwLock;

use crate::error::BridgeError;
use crate::mcp::schema::{PromptDescriptor, ToolDescriptor, ToolResult};
use crate::util::timeout::with_timeout;

use super::JsonObject;

pub(super) type ClientService = RunningService<RoleClient, ()>;

/// Running rmcp service for one server, absent until started.
pub(super) struct RmcpConnection {
    server: String,
    service: RwLock<Option<ClientService>>,
}

impl RmcpConnection {
    pub(super) fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            service: RwLock::new(None),
        }
    }

    pub(super) fn server(&self) -> &str {
        &self.server
    }

    pub(super) async fn is_started(&self) -> bool {
        self.service.read().await.is_some()
    }

    pub(super) async fn attach(&self, service: ClientService) {
        let previous = self.service.write().await.replace(service);
        if let Some(previous) = previous {
            let _ = previous.cancel().await;
        }
    }

    /// Spawn a child process speaking MCP over stdio and complete the handshake.
    pub(super) async fn serve_child_process(&self, command: Command) -> Result<(), BridgeError> {
        let transport = TokioChildProcess::new(command)
            .map_err(|e| BridgeError::mcp(&self.server, format!("spawn process: {e}")))?;
        let service = ()
            .serve(transport)
            .await
            .map_err(|e| BridgeError::mcp(&self.server, format!("initialize: {e}")))?;
        self.attach(service).await;
        Ok(())
    }

    async fn peer(&self) -> Result<Peer<RoleClient>, BridgeError> {
        match self.service.read().await.as_ref() {
            Some(service) => Ok(service.peer().clone()),
            None => Err(BridgeError::unavailable(
                &self.server,
                "session is not started",
            )),
        }
    }

    pub(super) async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, BridgeError> {
        let tools = self
            .peer()
            .await?
            .list_all_tools()
            .await
            .map_err(|e| self.map_service_error("list_tools", e))?;
        tools.into_iter().map(convert).collect()
    }

    pub(super) async fn list_prompts(&self) -> Result<Vec<PromptDescriptor>, BridgeError> {
        let prompts = self
            .peer()
            .await?
            .list_all_prompts()
            .await
            .map_err(|e| self.map_service_error("list_prompts", e))?;
        prompts.into_iter().map(convert).collect()
    }

    pub(super) async fn call_tool(
        &self,
        name: &str,
        arguments: JsonObject,
        timeout: Option<Duration>,
    ) -> Result<ToolResult, BridgeError> {
        let peer = self.peer().await?;
        let request = CallToolRequestParam {
            name: name.to_owned().into(),
            arguments: Some(arguments),
        };
        let call = async {
            peer.call_tool(request)
                .await
                .map_err(|e| self.map_service_error("call_tool", e))
        };
        let result = match timeout {
            Some(duration) => with_timeout(duration, call).await?,
            None => call.await?,
        };
        convert(result)
    }

    pub(super) async fn close(&self) -> Result<(), BridgeError> {
        let service = self.service.write().await.take();
        if let Some(service) = service {
            service
                .cancel()
                .await
                .map_err(|e| BridgeError::Transport(format!("close '{}': {e}", self.server)))?;
            tracing::debug!(server = %self.server, "MCP session closed");
        }
        Ok(())
    }

    fn map_service_error(&self, context: &str, error: ServiceError) -> BridgeError {
        match error {
            ServiceError::Timeout { timeout } => BridgeError::Timeout(timeout.as_millis() as u64),
            ServiceError::TransportClosed => {
                BridgeError::unavailable(&self.server, format!("{context}: transport closed"))
            }
            other => BridgeError::mcp(&self.server, format!("{context}: {other}")),
        }
    }
}

/// Convert an rmcp model value into the matching local type via its wire shape.
fn convert<S: Serialize, T: DeserializeOwned>(value: S) -> Result<T, BridgeError> {
    Ok(serde_json::from_value(serde_json::to_value(value)?)?)
}
