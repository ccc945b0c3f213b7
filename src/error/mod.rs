//! Error types for the bridge.

pub mod unified;

pub use unified::{ErrorCategory, ErrorCode, ErrorDetails, ErrorEnvelope};

use thiserror::Error;

/// Primary error type for all bridge operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Server not found: {0}")]
    ServerNotFound(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    #[error("Session '{server}' unavailable: {reason}")]
    SessionUnavailable { server: String, reason: String },

    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Failed to parse inference response: {message}")]
    UpstreamParse { message: String, body: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("MCP error ({server}): {message}")]
    Mcp { server: String, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl BridgeError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an MCP error attributed to a server.
    pub fn mcp(server: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Mcp {
            server: server.into(),
            message: message.to_string(),
        }
    }

    /// Create a session-unavailable error.
    pub fn unavailable(server: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SessionUnavailable {
            server: server.into(),
            reason: reason.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::ServerNotFound(_) | Self::ToolNotFound(_) | Self::PromptNotFound(_) => {
                ErrorCategory::NotFound
            }
            Self::SessionUnavailable { .. } | Self::Mcp { .. } | Self::Transport(_) => {
                ErrorCategory::Unavailable
            }
            Self::InvalidArguments { .. } => ErrorCategory::InvalidRequest,
            Self::UpstreamParse { .. } => ErrorCategory::Upstream,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                400..=499 => ErrorCategory::InvalidRequest,
                _ => ErrorCategory::Upstream,
            },
            Self::Network(_) | Self::Io(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::InvalidState(_) => ErrorCategory::Unknown,
        }
    }

    /// Machine-readable code for error bodies.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Authentication(_) => ErrorCode::InvalidApiKey,
            Self::ServerNotFound(_) => ErrorCode::ServerNotFound,
            Self::ToolNotFound(_) => ErrorCode::ToolNotFound,
            Self::PromptNotFound(_) => ErrorCode::PromptNotFound,
            Self::SessionUnavailable { .. } | Self::Mcp { .. } | Self::Transport(_) => {
                ErrorCode::SessionUnavailable
            }
            Self::InvalidArguments { .. } | Self::Serialization(_) => ErrorCode::InvalidRequest,
            Self::UpstreamParse { .. } => ErrorCode::UpstreamParseFailure,
            Self::Api { status, .. } if *status < 500 => ErrorCode::InvalidRequest,
            Self::Api { .. } => ErrorCode::UpstreamError,
            Self::Network(_) | Self::Io(_) => ErrorCode::NetworkError,
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::Configuration(_) | Self::InvalidState(_) => ErrorCode::ServerError,
        }
    }

    /// Render this error as an OpenAI-style error envelope.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let kind = match self.category() {
            ErrorCategory::Authentication => "authentication_error",
            ErrorCategory::InvalidRequest | ErrorCategory::NotFound => "invalid_request_error",
            ErrorCategory::Upstream | ErrorCategory::Network | ErrorCategory::Timeout => {
                "upstream_error"
            }
            _ => "server_error",
        };
        ErrorEnvelope {
            error: ErrorDetails {
                message: self.to_string(),
                kind: kind.to_string(),
                code: self.code(),
            },
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, BridgeError>;
