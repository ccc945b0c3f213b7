use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ApiError;
use super::AppState;
use crate::mcp::{ServerPrompt, ServerTool, SessionStatus};
use crate::openai::{ChatCompletionRequest, ChatCompletionResponse};

#[derive(Debug, Default, Deserialize)]
pub(super) struct ModelQuery {
    model: Option<String>,
}

pub(super) async fn health(State(state): State<AppState>) -> Json<Value> {
    if state.log_server_pings {
        tracing::info!("Health check");
    }
    Json(json!({ "status": "ok" }))
}

pub(super) async fn chat_completions(
    State(state): State<AppState>,
    payload: Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Result<Json<ChatCompletionResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    if request.messages.is_empty() {
        return Err(ApiError::bad_request("'messages' must contain at least one message"));
    }
    if request.stream == Some(true) {
        tracing::debug!(model = %request.model, "Streaming requested, answering with a single response");
    }

    let response = state.orchestrator.run(request).await?;
    Ok(Json(response))
}

pub(super) async fn list_servers(State(state): State<AppState>) -> Json<Vec<SessionStatus>> {
    Json(state.orchestrator.manager().statuses())
}

pub(super) async fn list_tools(
    State(state): State<AppState>,
    Query(query): Query<ModelQuery>,
) -> Json<Vec<ServerTool>> {
    Json(
        state
            .orchestrator
            .manager()
            .list_tools_for_model(query.model.as_deref())
            .await,
    )
}

pub(super) async fn list_prompts(
    State(state): State<AppState>,
    Query(query): Query<ModelQuery>,
) -> Json<Vec<ServerPrompt>> {
    Json(
        state
            .orchestrator
            .manager()
            .list_prompts_for_model(query.model.as_deref())
            .await,
    )
}
