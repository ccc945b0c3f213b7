mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use common::{
    manager_with, stop_reply, tool_calls_reply, unrestricted, FakeSession, ScriptedBackend,
};
use mcp_bridge::agent_loop::{LoopLimits, Orchestrator};
use mcp_bridge::config::AgentLoopConfig;
use mcp_bridge::error::BridgeError;
use mcp_bridge::mcp::ToolResult;
use mcp_bridge::openai::{ChatCompletionRequest, ChatMessage, FinishReason, Role};

fn request(model: &str) -> ChatCompletionRequest {
    ChatCompletionRequest::new(
        model,
        vec![
            ChatMessage::system("You are helpful."),
            ChatMessage::user("What is the weather in Oslo?"),
        ],
    )
}

#[tokio::test]
async fn tool_round_trip_ends_with_final_answer() {
    let weather = FakeSession::new(&["get_weather"])
        .with_result("get_weather", ToolResult::text("Oslo: 4C, light rain"));
    let calls = weather.calls();
    let manager = Arc::new(manager_with(vec![("weather", unrestricted(), weather)]).await);
    let backend = Arc::new(ScriptedBackend::new([
        tool_calls_reply(&[("call_1", "get_weather", r#"{"query":"Oslo"}"#)]),
        stop_reply("It is 4C and raining in Oslo."),
    ]));
    let orchestrator = Orchestrator::new(manager, backend.clone(), &AgentLoopConfig::default());

    let response = orchestrator.run(request("gpt-x")).await.unwrap();

    assert_eq!(response.choices[0].finish_reason, FinishReason::Stop);
    assert_eq!(
        response.choices[0].message.text().as_deref(),
        Some("It is 4C and raining in Oslo.")
    );
    assert_eq!(calls.lock().unwrap().len(), 1);

    let sent = backend.requests();
    assert_eq!(sent.len(), 2);

    let tools = sent[0].tools.as_ref().expect("MCP tools attached");
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].function.name, "get_weather");

    let second = &sent[1].messages;
    assert_eq!(second.len(), 4);
    assert_eq!(second[2].role, Role::Assistant);
    assert_eq!(second[2].tool_calls()[0].id, "call_1");
    assert_eq!(second[3].role, Role::Tool);
    assert_eq!(second[3].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(second[3].text().as_deref(), Some("Oslo: 4C, light rain"));
}

#[tokio::test]
async fn batch_keeps_order_and_skips_unparseable_arguments() {
    let session = FakeSession::new(&["search", "fetch"]);
    let calls = session.calls();
    let manager = Arc::new(manager_with(vec![("s", unrestricted(), session)]).await);
    let backend = Arc::new(ScriptedBackend::new([
        tool_calls_reply(&[
            ("call_a", "fetch", r#"{"query":"a"}"#),
            ("call_bad", "search", "{not json"),
            ("call_b", "search", r#"{"query":"b"}"#),
        ]),
        stop_reply("done"),
    ]));
    let orchestrator = Orchestrator::new(manager, backend.clone(), &AgentLoopConfig::default());

    orchestrator.run(request("gpt-x")).await.unwrap();

    let invoked: Vec<String> = calls.lock().unwrap().iter().map(|(n, _)| n.clone()).collect();
    assert_eq!(invoked, vec!["fetch".to_string(), "search".to_string()]);

    let second = &backend.requests()[1].messages;
    let tool_ids: Vec<&str> = second
        .iter()
        .filter(|m| m.role == Role::Tool)
        .filter_map(|m| m.tool_call_id.as_deref())
        .collect();
    assert_eq!(tool_ids, vec!["call_a", "call_b"]);
}

#[tokio::test]
async fn fill_missing_results_answers_every_call() {
    let manager = Arc::new(manager_with(vec![("s", unrestricted(), FakeSession::new(&["search"]))]).await);
    let backend = Arc::new(ScriptedBackend::new([
        tool_calls_reply(&[("call_bad", "search", "{not json"), ("call_gone", "missing", "{}")]),
        stop_reply("done"),
    ]));
    let config = AgentLoopConfig {
        fill_missing_tool_results: true,
        ..Default::default()
    };
    let orchestrator = Orchestrator::new(manager, backend.clone(), &config);

    orchestrator.run(request("gpt-x")).await.unwrap();

    let second = &backend.requests()[1].messages;
    let tool_messages: Vec<&ChatMessage> = second.iter().filter(|m| m.role == Role::Tool).collect();
    assert_eq!(tool_messages.len(), 2);
    assert!(tool_messages[0].text().unwrap().starts_with("Error:"));
    assert_eq!(tool_messages[1].tool_call_id.as_deref(), Some("call_gone"));
}

#[tokio::test]
async fn denied_tool_is_reported_to_the_model() {
    let session = FakeSession::new(&["search"]);
    let calls = session.calls();
    let manager = Arc::new(
        manager_with(vec![("gated", unrestricted().with_allowed_models(["gpt-x"]), session)]).await,
    );
    let backend = Arc::new(ScriptedBackend::new([
        tool_calls_reply(&[("call_1", "search", "{}")]),
        stop_reply("I cannot search."),
    ]));
    let orchestrator = Orchestrator::new(manager, backend.clone(), &AgentLoopConfig::default());

    orchestrator.run(request("other")).await.unwrap();

    assert!(calls.lock().unwrap().is_empty());
    let sent = backend.requests();
    assert!(sent[0].tools.is_none(), "no tools visible to 'other'");
    let tool_message = sent[1]
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .expect("denial is carried as a tool message");
    assert!(tool_message.text().unwrap().contains("not available for model 'other'"));
}

#[tokio::test]
async fn denial_is_reported_even_when_arguments_are_malformed() {
    let session = FakeSession::new(&["search"]);
    let manager = Arc::new(
        manager_with(vec![("gated", unrestricted().with_allowed_models(["gpt-x"]), session)]).await,
    );
    let backend = Arc::new(ScriptedBackend::new([
        tool_calls_reply(&[("call_1", "search", "{not json")]),
        stop_reply("ok"),
    ]));
    let orchestrator = Orchestrator::new(manager, backend.clone(), &AgentLoopConfig::default());

    orchestrator.run(request("other")).await.unwrap();

    let tool_message = backend.requests()[1]
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .cloned()
        .expect("denial is carried as a tool message");
    assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
    assert!(tool_message.text().unwrap().contains("not available for model 'other'"));
}

#[tokio::test]
async fn caller_tools_and_streaming_are_replaced() {
    let manager = Arc::new(manager_with(vec![("s", unrestricted(), FakeSession::new(&["search"]))]).await);
    let backend = Arc::new(ScriptedBackend::new([stop_reply("hi")]));
    let orchestrator = Orchestrator::new(manager, backend.clone(), &AgentLoopConfig::default());

    let mut req: ChatCompletionRequest = serde_json::from_value(json!({
        "model": "gpt-x",
        "messages": [{ "role": "user", "content": "hi" }],
        "stream": true,
        "temperature": 0.2,
        "tools": [{ "type": "function", "function": { "name": "caller_tool" } }]
    }))
    .unwrap();
    req.extra.insert("stream_options".into(), json!({ "include_usage": true }));

    orchestrator.run(req).await.unwrap();

    let sent = &backend.requests()[0];
    assert_ne!(sent.stream, Some(true));
    assert!(!sent.extra.contains_key("stream_options"));
    assert_eq!(sent.extra.get("temperature"), Some(&json!(0.2)));
    let names: Vec<&str> = sent
        .tools
        .as_ref()
        .unwrap()
        .iter()
        .map(|t| t.function.name.as_str())
        .collect();
    assert_eq!(names, vec!["search"]);
}

#[tokio::test]
async fn unparseable_backend_body_fails_the_run() {
    let manager = Arc::new(manager_with(vec![]).await);
    let backend = Arc::new(ScriptedBackend::default());
    backend.push_raw(Ok("<html>bad gateway</html>".to_string()));
    let orchestrator = Orchestrator::new(manager, backend, &AgentLoopConfig::default());

    let err = orchestrator.run(request("gpt-x")).await.unwrap_err();
    assert!(matches!(err, BridgeError::UpstreamParse { .. }));
}

#[tokio::test]
async fn iteration_ceiling_stops_endless_tool_loops() {
    let manager = Arc::new(manager_with(vec![("s", unrestricted(), FakeSession::new(&["search"]))]).await);
    let backend = Arc::new(ScriptedBackend::new(
        (0..5).map(|i| {
            let id = format!("call_{i}");
            tool_calls_reply(&[(id.as_str(), "search", "{}")])
        }),
    ));
    let orchestrator = Orchestrator::new(manager, backend.clone(), &AgentLoopConfig::default())
        .with_limits(LoopLimits {
            max_iterations: Some(2),
            tool_timeout: None,
        });

    let err = orchestrator.run(request("gpt-x")).await.unwrap_err();
    assert!(matches!(err, BridgeError::InvalidState(_)));
    assert_eq!(backend.requests().len(), 2);
}
