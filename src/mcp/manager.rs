//! Session manager: owns one session per enabled server, in configuration order.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;

use crate::config::{ServerConfig, ServerMap, TransportKind};
use crate::error::BridgeError;
use crate::policy::{self, PolicyDecision};
use crate::util::timeout::with_timeout;

use super::schema::{PromptDescriptor, ToolDescriptor, ToolResult};
use super::transport::{self, JsonObject, ToolSession};

/// Connection lifecycle of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Ready,
    Failed(String),
    Closed,
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Failed(_) => "failed",
            Self::Closed => "closed",
        }
    }
}

/// Runtime handle for one configured server.
pub struct Session {
    name: String,
    config: ServerConfig,
    state: RwLock<SessionState>,
    inner: Box<dyn ToolSession>,
}

impl Session {
    fn new(name: impl Into<String>, config: ServerConfig, inner: Box<dyn ToolSession>) -> Self {
        Self {
            name: name.into(),
            config,
            state: RwLock::new(SessionState::Starting),
            inner,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn kind(&self) -> TransportKind {
        self.inner.kind()
    }

    pub fn state(&self) -> SessionState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    fn set_state(&self, state: SessionState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn ensure_ready(&self) -> Result<(), BridgeError> {
        match self.state() {
            SessionState::Ready => Ok(()),
            SessionState::Failed(reason) => Err(BridgeError::unavailable(&self.name, reason)),
            other => Err(BridgeError::unavailable(
                &self.name,
                format!("session is {}", other.label()),
            )),
        }
    }

    /// Connect and handshake within the server's startup timeout.
    async fn start(&self) {
        let timeout = self.config.startup_timeout();
        match with_timeout(timeout, self.inner.start()).await {
            Ok(()) => {
                self.set_state(SessionState::Ready);
                tracing::info!(server = %self.name, transport = %self.kind(), "MCP session ready");
            }
            Err(err) => {
                tracing::error!(server = %self.name, error = %err, "Failed to start MCP session");
                self.set_state(SessionState::Failed(err.to_string()));
            }
        }
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, BridgeError> {
        self.ensure_ready()?;
        self.inner.list_tools().await
    }

    pub async fn list_prompts(&self) -> Result<Vec<PromptDescriptor>, BridgeError> {
        self.ensure_ready()?;
        self.inner.list_prompts().await
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: JsonObject,
        timeout: Option<Duration>,
    ) -> Result<ToolResult, BridgeError> {
        self.ensure_ready()?;
        self.inner.call_tool(name, arguments, timeout).await
    }

    async fn close(&self) -> Result<(), BridgeError> {
        if self.is_ready() {
            self.inner.close().await?;
        }
        self.set_state(SessionState::Closed);
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("state", &self.state())
            .finish()
    }
}

/// Status row for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub name: String,
    pub transport: TransportKind,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A discovered tool together with the server that exposes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerTool {
    pub server: String,
    #[serde(flatten)]
    pub tool: ToolDescriptor,
}

/// A discovered prompt together with the server that exposes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerPrompt {
    pub server: String,
    #[serde(flatten)]
    pub prompt: PromptDescriptor,
}

/// Owns the named sessions. Read-only once initialized.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: Vec<Arc<Session>>,
    index: HashMap<String, usize>,
}

impl SessionManager {
    /// Build and start a session per enabled server using the configured transports.
    pub async fn initialize(servers: &ServerMap) -> Self {
        Self::initialize_with(servers, transport::connect).await
    }

    /// Like [`SessionManager::initialize`] with a custom session builder.
    ///
    /// A server whose start fails, or outlasts its `startup_timeout_secs`, is
    /// kept in the `Failed` state; it never aborts initialization of the others.
    pub async fn initialize_with<F>(servers: &ServerMap, mut connector: F) -> Self
    where
        F: FnMut(&str, &ServerConfig) -> Box<dyn ToolSession>,
    {
        tracing::debug!(servers = servers.len(), "Initializing MCP session manager");
        let mut manager = Self::default();

        for (name, config) in servers.iter() {
            if config.disabled {
                tracing::info!(server = %name, "Skipping disabled MCP server");
                continue;
            }
            let session = Session::new(name, config.clone(), connector(name, config));
            session.start().await;
            manager.index.insert(name.to_string(), manager.sessions.len());
            manager.sessions.push(Arc::new(session));
        }

        let ready = manager.sessions.iter().filter(|s| s.is_ready()).count();
        tracing::info!(ready, total = manager.sessions.len(), "MCP session manager initialized");
        manager
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Look up a configured, non-disabled server by name.
    pub fn get(&self, name: &str) -> Result<Arc<Session>, BridgeError> {
        self.index
            .get(name)
            .map(|&position| Arc::clone(&self.sessions[position]))
            .ok_or_else(|| BridgeError::ServerNotFound(name.to_string()))
    }

    /// Sessions in configuration order, optionally filtered by model policy.
    ///
    /// Servers with a conflicting model policy are skipped and logged.
    pub fn list(&self, model: Option<&str>) -> Vec<Arc<Session>> {
        let Some(model) = model else {
            return self.sessions.clone();
        };

        self.sessions
            .iter()
            .filter(|session| match policy::check_model(session.config(), model) {
                PolicyDecision::Allow => true,
                PolicyDecision::Deny(reason) => {
                    tracing::debug!(server = %session.name(), %model, %reason, "Server hidden from model");
                    false
                }
                PolicyDecision::ConfigConflict(reason) => {
                    tracing::error!(
                        server = %session.name(),
                        %model,
                        %reason,
                        "Configuration conflict in model policy, skipping server"
                    );
                    false
                }
            })
            .cloned()
            .collect()
    }

    pub fn statuses(&self) -> Vec<SessionStatus> {
        self.sessions
            .iter()
            .map(|session| {
                let state = session.state();
                SessionStatus {
                    name: session.name().to_string(),
                    transport: session.kind(),
                    state: state.label(),
                    error: match state {
                        SessionState::Failed(reason) => Some(reason),
                        _ => None,
                    },
                }
            })
            .collect()
    }

    /// Tools usable by `model`, in configuration order then server order.
    ///
    /// Discovery failures and tool-policy conflicts skip the affected server.
    pub async fn list_tools_for_model(&self, model: Option<&str>) -> Vec<ServerTool> {
        let mut merged = Vec::new();

        for session in self.list(model) {
            if !session.is_ready() {
                continue;
            }
            let overlap = policy::tool_list_overlap(session.config());
            if !overlap.is_empty() {
                tracing::error!(
                    server = %session.name(),
                    tools = ?overlap,
                    "Configuration conflict in tool policy, skipping server"
                );
                continue;
            }
            let tools = match session.list_tools().await {
                Ok(tools) => tools,
                Err(err) => {
                    tracing::warn!(server = %session.name(), error = %err, "Tool discovery failed");
                    continue;
                }
            };
            merged.extend(
                tools
                    .into_iter()
                    .filter(|tool| policy::check_tool(session.config(), &tool.name).is_allowed())
                    .map(|tool| ServerTool {
                        server: session.name().to_string(),
                        tool,
                    }),
            );
        }

        merged
    }

    /// Prompts visible to `model`, in configuration order.
    pub async fn list_prompts_for_model(&self, model: Option<&str>) -> Vec<ServerPrompt> {
        let mut merged = Vec::new();

        for session in self.list(model) {
            if !session.is_ready() {
                continue;
            }
            match session.list_prompts().await {
                Ok(prompts) => merged.extend(prompts.into_iter().map(|prompt| ServerPrompt {
                    server: session.name().to_string(),
                    prompt,
                })),
                Err(err) => {
                    tracing::warn!(server = %session.name(), error = %err, "Prompt discovery failed");
                }
            }
        }

        merged
    }

    /// Close every session. Errors are logged; all sessions end `Closed`.
    pub async fn shutdown(&self) {
        for session in &self.sessions {
            if let Err(err) = session.close().await {
                tracing::warn!(server = %session.name(), error = %err, "Error closing MCP session");
            }
        }
        tracing::info!("MCP sessions shut down");
    }
}
