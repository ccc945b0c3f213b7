use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::TransportKind;
use crate::error::BridgeError;

use super::schema::{PromptDescriptor, ToolDescriptor, ToolResult};
use super::transport::{JsonObject, ToolSession};

pub(crate) type CallLog = Arc<StdMutex<Vec<(String, JsonObject)>>>;

/// Scripted in-memory session.
pub(crate) struct MockSession {
    tools: Vec<ToolDescriptor>,
    prompts: Vec<PromptDescriptor>,
    results: HashMap<String, ToolResult>,
    fail_start: bool,
    hang_start: bool,
    fail_discovery: bool,
    calls: CallLog,
    close_calls: Arc<AtomicUsize>,
}

impl MockSession {
    pub(crate) fn with_tools<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            tools: names
                .into_iter()
                .map(|name| ToolDescriptor::new(name, format!("{name} tool")))
                .collect(),
            prompts: Vec::new(),
            results: HashMap::new(),
            fail_start: false,
            hang_start: false,
            fail_discovery: false,
            calls: Arc::new(StdMutex::new(Vec::new())),
            close_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn with_prompts<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.prompts = names.into_iter().map(PromptDescriptor::new).collect();
        self
    }

    pub(crate) fn with_result(mut self, tool: &str, result: ToolResult) -> Self {
        self.results.insert(tool.to_string(), result);
        self
    }

    pub(crate) fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// The handshake never completes.
    pub(crate) fn hanging_start(mut self) -> Self {
        self.hang_start = true;
        self
    }

    pub(crate) fn failing_discovery(mut self) -> Self {
        self.fail_discovery = true;
        self
    }

    pub(crate) fn calls(&self) -> CallLog {
        Arc::clone(&self.calls)
    }

    pub(crate) fn close_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.close_calls)
    }
}

#[async_trait]
impl ToolSession for MockSession {
    fn kind(&self) -> TransportKind {
        TransportKind::Stdio
    }

    async fn start(&self) -> Result<(), BridgeError> {
        if self.fail_start {
            return Err(BridgeError::mcp("mock", "spawn process: not found"));
        }
        if self.hang_start {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, BridgeError> {
        if self.fail_discovery {
            return Err(BridgeError::mcp("mock", "list_tools: connection reset"));
        }
        Ok(self.tools.clone())
    }

    async fn list_prompts(&self) -> Result<Vec<PromptDescriptor>, BridgeError> {
        if self.fail_discovery {
            return Err(BridgeError::mcp("mock", "list_prompts: connection reset"));
        }
        Ok(self.prompts.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: JsonObject,
        _timeout: Option<Duration>,
    ) -> Result<ToolResult, BridgeError> {
        self.calls
            .lock()
            .expect("call log lock should not be poisoned")
            .push((name.to_string(), arguments));
        Ok(self
            .results
            .get(name)
            .cloned()
            .unwrap_or_else(|| ToolResult::text(format!("{name} ok"))))
    }

    async fn close(&self) -> Result<(), BridgeError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
