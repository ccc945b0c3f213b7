//! Conversation orchestrator: drives the chat-completion / tool-execution loop.
//!
//! One run per inbound request:
//! `Dispatch -> AwaitResponse -> (Complete | HandleToolCalls -> AwaitResponse ...)`.
//! Tool calls in a batch run sequentially so tool messages keep request order.

mod limits;
mod tool_phase;

pub use limits::{LoopLimits, MAX_ITERATIONS_ENV};

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::config::AgentLoopConfig;
use crate::error::BridgeError;
use crate::inference::ChatBackend;
use crate::mcp::SessionManager;
use crate::openai::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChatTool, ToolCall};
use crate::router::ToolRouter;

use tool_phase::ToolPhaseOptions;

/// Unique run identifier.
pub type RunId = Uuid;

/// Non-terminal and terminal states of one run. Failure is the `Err` path.
#[derive(Debug)]
enum RunState {
    Dispatch,
    AwaitResponse,
    HandleToolCalls(Vec<ToolCall>),
    Complete(ChatCompletionResponse),
}

/// Shared, per-process orchestrator. Each [`Orchestrator::run`] owns its own conversation.
#[derive(Clone)]
pub struct Orchestrator {
    manager: Arc<SessionManager>,
    router: ToolRouter,
    backend: Arc<dyn ChatBackend>,
    limits: LoopLimits,
    fill_missing_tool_results: bool,
}

impl Orchestrator {
    pub fn new(
        manager: Arc<SessionManager>,
        backend: Arc<dyn ChatBackend>,
        config: &AgentLoopConfig,
    ) -> Self {
        Self {
            router: ToolRouter::new(Arc::clone(&manager)),
            manager,
            backend,
            limits: LoopLimits::from_config(config),
            fill_missing_tool_results: config.fill_missing_tool_results,
        }
    }

    pub fn with_limits(mut self, limits: LoopLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    pub fn router(&self) -> &ToolRouter {
        &self.router
    }

    /// Run the conversation to completion and return the final backend response.
    pub async fn run(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, BridgeError> {
        let run_id: RunId = Uuid::new_v4();
        let span = tracing::info_span!("chat_completion", %run_id, model = %request.model);
        self.drive(request).instrument(span).await
    }

    async fn drive(
        &self,
        mut request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, BridgeError> {
        let model = request.model.clone();
        let options = ToolPhaseOptions {
            timeout: self.limits.tool_timeout,
            fill_missing_results: self.fill_missing_tool_results,
        };
        let mut iteration = 0usize;
        let mut state = RunState::Dispatch;

        loop {
            state = match state {
                RunState::Dispatch => {
                    self.merge_tools(&mut request).await;
                    RunState::AwaitResponse
                }
                RunState::AwaitResponse => {
                    iteration += 1;
                    self.limits.check(iteration)?;

                    let body = self.backend.create_chat_completion(&request).await?;
                    let response = parse_response(&body)?;
                    let choice = &response.choices[0];
                    request.messages.push(ChatMessage::assistant(
                        choice.message.content.clone(),
                        choice.message.tool_calls.clone(),
                    ));

                    tracing::debug!(iteration, finish_reason = %choice.finish_reason, "Inference response");
                    if choice.finish_reason.is_terminal() {
                        RunState::Complete(response)
                    } else if choice.message.tool_calls().is_empty() {
                        tracing::debug!("No tool calls despite non-terminal finish reason, completing");
                        RunState::Complete(response)
                    } else {
                        RunState::HandleToolCalls(choice.message.tool_calls().to_vec())
                    }
                }
                RunState::HandleToolCalls(calls) => {
                    let messages =
                        tool_phase::run_tool_calls(&self.router, &calls, &model, options).await;
                    request.messages.extend(messages);
                    RunState::AwaitResponse
                }
                RunState::Complete(response) => {
                    tracing::info!(iterations = iteration, "Chat completion finished");
                    return Ok(response);
                }
            };
        }
    }

    /// Replace caller tools with the filtered MCP tool set and force a non-streaming call.
    async fn merge_tools(&self, request: &mut ChatCompletionRequest) {
        let tools: Vec<ChatTool> = self
            .manager
            .list_tools_for_model(Some(&request.model))
            .await
            .into_iter()
            .map(|server_tool| ChatTool::from(server_tool.tool))
            .collect();
        tracing::debug!(tools = tools.len(), "Merged MCP tools into request");

        if request.stream.take() == Some(true) {
            tracing::debug!("Streaming requested; serving a non-streaming response");
        }
        request.extra.remove("stream_options");

        if tools.is_empty() {
            request.tools = None;
            request.extra.remove("tool_choice");
            request.extra.remove("parallel_tool_calls");
        } else {
            request.tools = Some(tools);
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("sessions", &self.manager.len())
            .field("limits", &self.limits)
            .field("fill_missing_tool_results", &self.fill_missing_tool_results)
            .finish()
    }
}

/// Parse a backend body; a body that does not match the schema fails the run.
fn parse_response(body: &str) -> Result<ChatCompletionResponse, BridgeError> {
    let response: ChatCompletionResponse = serde_json::from_str(body).map_err(|e| {
        tracing::error!(error = %e, body = %body, "Error parsing inference response");
        BridgeError::UpstreamParse {
            message: e.to_string(),
            body: body.to_string(),
        }
    })?;
    if response.choices.is_empty() {
        tracing::error!(body = %body, "Inference response has no choices");
        return Err(BridgeError::UpstreamParse {
            message: "response contains no choices".into(),
            body: body.to_string(),
        });
    }
    Ok(response)
}
