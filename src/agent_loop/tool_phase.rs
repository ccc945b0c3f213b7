use std::time::Duration;

use crate::mcp::ToolResult;
use crate::openai::{ChatMessage, ToolCall};
use crate::router::ToolRouter;

/// Tool-phase knobs for one run.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct ToolPhaseOptions {
    pub(super) timeout: Option<Duration>,
    pub(super) fill_missing_results: bool,
}

/// Tool-role message for a successful invocation: text parts only, never empty.
pub(super) fn tool_message(call: &ToolCall, result: &ToolResult) -> ChatMessage {
    let texts: Vec<&str> = result.text_parts();
    if texts.is_empty() {
        ChatMessage::tool(&call.id, [crate::mcp::schema::EMPTY_RESULT_TEXT])
    } else {
        ChatMessage::tool(&call.id, texts)
    }
}

/// Run a batch of tool calls strictly in order, one message per handled call.
///
/// A call the router cannot serve gets no message unless
/// `fill_missing_results` is set.
pub(super) async fn run_tool_calls(
    router: &ToolRouter,
    calls: &[ToolCall],
    model: &str,
    options: ToolPhaseOptions,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(calls.len());

    for call in calls {
        let tool = call.function.name.as_str();
        tracing::debug!(%tool, call_id = %call.id, arguments = %call.function.arguments, "Tool call");

        match router
            .invoke(tool, &call.function.arguments, options.timeout, Some(model))
            .await
        {
            Ok(result) => {
                tracing::debug!(%tool, call_id = %call.id, is_error = result.is_error, "Tool call result");
                messages.push(tool_message(call, &result));
            }
            Err(err) => {
                tracing::warn!(%tool, call_id = %call.id, error = %err, "Tool call produced no result");
                if options.fill_missing_results {
                    messages.push(ChatMessage::tool(
                        &call.id,
                        [format!("Error: tool call '{tool}' failed: {err}")],
                    ));
                }
            }
        }
    }

    messages
}
