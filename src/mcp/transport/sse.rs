use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rmcp::transport::sse_client::SseClientConfig;
use rmcp::transport::SseClientTransport;
use rmcp::ServiceExt;

use crate::config::{SseServerConfig, TransportKind};
use crate::error::BridgeError;
use crate::mcp::schema::{PromptDescriptor, ToolDescriptor, ToolResult};

use super::common::RmcpConnection;
use super::{JsonObject, ToolSession};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// SSE-based MCP session (for remote MCP servers).
pub struct SseSession {
    config: SseServerConfig,
    connection: RmcpConnection,
}

impl SseSession {
    pub fn new(name: impl Into<String>, config: SseServerConfig) -> Self {
        Self {
            config,
            connection: RmcpConnection::new(name),
        }
    }

    pub fn config(&self) -> &SseServerConfig {
        &self.config
    }
}

/// HTTP client carrying the configured headers on every request.
fn build_http_client(
    server: &str,
    headers: &BTreeMap<String, String>,
) -> Result<reqwest::Client, BridgeError> {
    let mut default_headers = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| BridgeError::mcp(server, format!("invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| BridgeError::mcp(server, format!("invalid value for '{name}': {e}")))?;
        default_headers.insert(name, value);
    }

    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .default_headers(default_headers)
        .build()
        .map_err(|e| BridgeError::mcp(server, format!("build HTTP client: {e}")))
}

#[async_trait]
impl ToolSession for SseSession {
    fn kind(&self) -> TransportKind {
        TransportKind::Sse
    }

    async fn start(&self) -> Result<(), BridgeError> {
        if self.connection.is_started().await {
            return Ok(());
        }
        let server = self.connection.server();
        tracing::debug!(server = %server, url = %self.config.url, "Connecting to SSE MCP server");

        let client = build_http_client(server, &self.config.headers)?;
        let sse_config = SseClientConfig {
            sse_endpoint: self.config.url.clone().into(),
            ..Default::default()
        };
        let transport = SseClientTransport::start_with_client(client, sse_config)
            .await
            .map_err(|e| BridgeError::mcp(server, format!("create SSE transport: {e}")))?;
        let service = ()
            .serve(transport)
            .await
            .map_err(|e| BridgeError::mcp(server, format!("initialize: {e}")))?;
        self.connection.attach(service).await;
        Ok(())
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

    #[test]
    fn http_client_accepts_valid_headers() {
        let headers = BTreeMap::from([("Authorization".to_string(), "Bearer t0k".to_string())]);
        assert!(build_http_client("docs", &headers).is_ok());
    }

    #[test]
    fn http_client_rejects_invalid_header_name() {
        let headers = BTreeMap::from([("bad header".to_string(), "x".to_string())]);
        let err = build_http_client("docs", &headers).expect_err("space in name is invalid");
        assert!(matches!(
            err,
            BridgeError::Mcp { server, message } if server == "docs" && message.contains("header")
        ));
    }

    #[tokio::test]
    async fn start_fails_when_endpoint_is_unreachable() {
        // Port 9 (discard) is closed on test hosts.
        let session = SseSession::new(
            "docs",
            SseServerConfig {
                url: "http://127.0.0.1:9/sse".into(),
                headers: BTreeMap::new(),
            },
        );
        let started = tokio::time::timeout(Duration::from_secs(5), session.start()).await;
        assert!(!matches!(started, Ok(Ok(()))));
        assert!(matches!(
            session.list_tools().await,
            Err(BridgeError::SessionUnavailable { .. })
        ));
    }
}
