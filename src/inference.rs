//! Inference backend: the OpenAI-compatible endpoint the bridge forwards to.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::config::InferenceServerConfig;
use crate::error::BridgeError;
use crate::openai::ChatCompletionRequest;

/// Posts chat-completion requests and returns the raw response body.
///
/// The body is returned unparsed so the caller owns schema validation.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<String, BridgeError>;
}

/// [`ChatBackend`] over HTTP with bearer authentication.
#[derive(Debug, Clone)]
pub struct HttpChatBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpChatBackend {
    pub fn new(config: &InferenceServerConfig) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<String, BridgeError> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(model = %request.model, messages = request.messages.len(), "POST chat completion");

        let resp = self
            .client
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(request)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.text().await?;
        if !(200..300).contains(&status) {
            return Err(status_to_error(status, &body));
        }
        Ok(body)
    }
}

/// Default headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Map a non-success HTTP status to an error.
pub fn status_to_error(status: u16, body: &str) -> BridgeError {
    match status {
        401 | 403 => BridgeError::Authentication(body.to_string()),
        _ => BridgeError::api(status, body),
    }
}
