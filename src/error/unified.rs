//! Unified error classification and the wire shape used to report failures.

use serde::{Deserialize, Serialize};

/// Machine-readable error code, rendered in OpenAI-style error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidApiKey,
    InvalidRequest,
    ServerNotFound,
    ToolNotFound,
    PromptNotFound,
    SessionUnavailable,
    UpstreamParseFailure,
    UpstreamError,
    Timeout,
    NetworkError,
    ServerError,
}

/// Broad error category; picks the envelope `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    Configuration,
    NotFound,
    Unavailable,
    InvalidRequest,
    Upstream,
    Network,
    Timeout,
    Serialization,
    Unknown,
}

/// Body of an OpenAI-style `{"error": {...}}` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub code: ErrorCode,
}

/// Envelope wrapping [`ErrorDetails`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetails,
}
