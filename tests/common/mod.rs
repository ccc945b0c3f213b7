//! Shared test helpers: in-memory tool sessions and a scripted chat backend.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use mcp_bridge::config::{ServerConfig, ServerMap, TransportKind};
use mcp_bridge::error::BridgeError;
use mcp_bridge::inference::ChatBackend;
use mcp_bridge::mcp::{
    JsonObject, PromptDescriptor, SessionManager, ToolDescriptor, ToolResult, ToolSession,
};
use mcp_bridge::openai::ChatCompletionRequest;

pub type CallLog = Arc<Mutex<Vec<(String, JsonObject)>>>;

/// In-memory tool server with a fixed tool list.
pub struct FakeSession {
    tools: Vec<ToolDescriptor>,
    prompts: Vec<PromptDescriptor>,
    results: HashMap<String, ToolResult>,
    fail_start: bool,
    calls: CallLog,
}

impl FakeSession {
    pub fn new(tools: &[&str]) -> Self {
        Self {
            tools: tools
                .iter()
                .map(|name| {
                    ToolDescriptor::new(*name, format!("{name} tool")).with_input_schema(json!({
                        "type": "object",
                        "properties": { "query": { "type": "string" } }
                    }))
                })
                .collect(),
            prompts: Vec::new(),
            results: HashMap::new(),
            fail_start: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_prompts(mut self, prompts: &[&str]) -> Self {
        self.prompts = prompts.iter().map(|p| PromptDescriptor::new(*p)).collect();
        self
    }

    pub fn with_result(mut self, tool: &str, result: ToolResult) -> Self {
        self.results.insert(tool.to_string(), result);
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn calls(&self) -> CallLog {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl ToolSession for FakeSession {
    fn kind(&self) -> TransportKind {
        TransportKind::Stdio
    }

    async fn start(&self) -> Result<(), BridgeError> {
        if self.fail_start {
            return Err(BridgeError::mcp("fake", "spawn process: No such file or directory"));
        }
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, BridgeError> {
        Ok(self.tools.clone())
    }

    async fn list_prompts(&self) -> Result<Vec<PromptDescriptor>, BridgeError> {
        Ok(self.prompts.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: JsonObject,
        _timeout: Option<Duration>,
    ) -> Result<ToolResult, BridgeError> {
        self.calls.lock().unwrap().push((name.to_string(), arguments));
        Ok(self
            .results
            .get(name)
            .cloned()
            .unwrap_or_else(|| ToolResult::text(format!("{name} ok"))))
    }

    async fn close(&self) -> Result<(), BridgeError> {
        Ok(())
    }
}

/// Builds a manager from `(name, config, session)` triples, in order.
pub async fn manager_with(servers: Vec<(&str, ServerConfig, FakeSession)>) -> SessionManager {
    let mut map = ServerMap::new();
    let mut sessions: HashMap<String, FakeSession> = HashMap::new();
    for (name, config, session) in servers {
        map.insert(name, config).unwrap();
        sessions.insert(name.to_string(), session);
    }
    SessionManager::initialize_with(&map, |name, _| {
        let session = sessions
            .remove(name)
            .unwrap_or_else(|| panic!("no fake session for {name}"));
        Box::new(session) as Box<dyn ToolSession>
    })
    .await
}

/// Stdio config that the fakes never spawn.
pub fn unrestricted() -> ServerConfig {
    ServerConfig::stdio("fake-server", vec![])
}

/// Backend that replays canned bodies and records every request.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, BridgeError>>>,
    requests: Mutex<Vec<ChatCompletionRequest>>,
}

impl ScriptedBackend {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|v| Ok(v.to_string())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_raw(&self, reply: Result<String, BridgeError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<String, BridgeError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BridgeError::api(500, "script exhausted")))
    }
}

/// Completion body asking for the given `(id, tool, arguments)` calls.
pub fn tool_calls_reply(calls: &[(&str, &str, &str)]) -> Value {
    let calls: Vec<Value> = calls
        .iter()
        .map(|(id, name, arguments)| {
            json!({
                "id": id,
                "type": "function",
                "function": { "name": name, "arguments": arguments }
            })
        })
        .collect();
    json!({
        "id": "chatcmpl-tools",
        "model": "gpt-x",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": null, "tool_calls": calls },
            "finish_reason": "tool_calls"
        }]
    })
}

/// Final completion body with plain text.
pub fn stop_reply(text: &str) -> Value {
    json!({
        "id": "chatcmpl-final",
        "model": "gpt-x",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": text },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    })
}
