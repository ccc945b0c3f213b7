//! Tool routing: maps a bare tool or prompt name to the session that owns it.

use std::sync::Arc;
use std::time::Duration;

use crate::error::BridgeError;
use crate::mcp::{JsonObject, Session, SessionManager, ToolResult};
use crate::policy::{self, PolicyDecision};

/// Routes tool calls to sessions. Holds no state beyond the manager handle.
#[derive(Debug, Clone)]
pub struct ToolRouter {
    manager: Arc<SessionManager>,
}

impl ToolRouter {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// First Ready session (configuration order) exposing `tool`.
    ///
    /// With a model, only sessions passing the model-level policy are searched.
    /// Discovery errors skip the failing session. Name collisions resolve to
    /// the earlier server.
    pub async fn find_owner(
        &self,
        tool: &str,
        model: Option<&str>,
    ) -> Result<Arc<Session>, BridgeError> {
        for session in self.manager.list(model) {
            if !session.is_ready() {
                continue;
            }
            match session.list_tools().await {
                Ok(tools) if tools.iter().any(|t| t.name == tool) => return Ok(session),
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(server = %session.name(), error = %err, "Skipping server during tool lookup");
                }
            }
        }
        Err(BridgeError::ToolNotFound(tool.to_string()))
    }

    /// First Ready session (configuration order) exposing `prompt`.
    pub async fn find_prompt_owner(
        &self,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<Arc<Session>, BridgeError> {
        for session in self.manager.list(model) {
            if !session.is_ready() {
                continue;
            }
            match session.list_prompts().await {
                Ok(prompts) if prompts.iter().any(|p| p.name == prompt) => return Ok(session),
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(server = %session.name(), error = %err, "Skipping server during prompt lookup");
                }
            }
        }
        Err(BridgeError::PromptNotFound(prompt.to_string()))
    }

    /// Owner to invoke `tool` on, with the policy decision for that triple.
    ///
    /// Prefers the first owner whose combined policy allows the call; falls
    /// back to the first owner at all so a denial can be reported in-band.
    async fn resolve_owner(
        &self,
        tool: &str,
        model: Option<&str>,
    ) -> Result<(Arc<Session>, PolicyDecision), BridgeError> {
        let mut fallback = None;

        for session in self.manager.list(None) {
            if !session.is_ready() {
                continue;
            }
            let exposes = match session.list_tools().await {
                Ok(tools) => tools.iter().any(|t| t.name == tool),
                Err(err) => {
                    tracing::debug!(server = %session.name(), error = %err, "Skipping server during tool lookup");
                    false
                }
            };
            if !exposes {
                continue;
            }
            let decision = policy::check(session.config(), model, tool);
            if decision.is_allowed() {
                return Ok((session, decision));
            }
            if fallback.is_none() {
                fallback = Some((session, decision));
            }
        }

        fallback.ok_or_else(|| BridgeError::ToolNotFound(tool.to_string()))
    }

    /// Invoke `tool` with raw JSON `arguments`.
    ///
    /// Arguments are parsed only once the call is allowed. Policy denials
    /// and conflicts come back as an `isError` result rather than an error,
    /// so the conversation can carry them.
    pub async fn invoke(
        &self,
        tool: &str,
        arguments: &str,
        timeout: Option<Duration>,
        model: Option<&str>,
    ) -> Result<ToolResult, BridgeError> {
        if tool.trim().is_empty() {
            return Err(BridgeError::ToolNotFound("(empty tool name)".into()));
        }
        let (session, decision) = self.resolve_owner(tool, model).await?;
        let model_label = model.unwrap_or("(none)");

        // Policy is settled before arguments are looked at.
        match decision {
            PolicyDecision::Allow => {
                let arguments = parse_arguments(tool, arguments)?;
                tracing::debug!(server = %session.name(), %tool, model = %model_label, "Invoking tool");
                session.call_tool(tool, arguments, timeout).await
            }
            PolicyDecision::Deny(reason) => {
                tracing::warn!(server = %session.name(), %tool, model = %model_label, %reason, "Tool call denied by policy");
                Ok(ToolResult::error(format!(
                    "Tool '{tool}' is not available for model '{model_label}' on server '{}': {reason}",
                    session.name()
                )))
            }
            PolicyDecision::ConfigConflict(reason) => {
                tracing::error!(server = %session.name(), %tool, model = %model_label, %reason, "Configuration conflict blocks tool call");
                Ok(ToolResult::error(format!(
                    "Tool '{tool}' cannot be used: configuration conflict on server '{}': {reason}",
                    session.name()
                )))
            }
        }
    }
}

/// Parse tool-call arguments into a JSON object. Blank input and `null` mean no arguments.
pub fn parse_arguments(tool: &str, raw: &str) -> Result<JsonObject, BridgeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(JsonObject::new());
    }
    let value: serde_json::Value =
        serde_json::from_str(trimmed).map_err(|e| BridgeError::InvalidArguments {
            tool: tool.to_string(),
            message: format!("arguments must be valid JSON: {e}"),
        })?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        serde_json::Value::Null => Ok(JsonObject::new()),
        other => Err(BridgeError::InvalidArguments {
            tool: tool.to_string(),
            message: format!("arguments must be a JSON object; got {other}"),
        }),
    }
}
