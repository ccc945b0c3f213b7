//! Mapping of bridge errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crate::error::{BridgeError, ErrorCode, ErrorDetails, ErrorEnvelope};

/// Error returned by route handlers, rendered as an OpenAI-style error body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    envelope: ErrorEnvelope,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            envelope: ErrorEnvelope {
                error: ErrorDetails {
                    message: message.into(),
                    kind: "invalid_request_error".to_string(),
                    code: ErrorCode::InvalidRequest,
                },
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// HTTP status for a bridge error.
pub fn status_for(err: &BridgeError) -> StatusCode {
    match err {
        BridgeError::Authentication(_) => StatusCode::UNAUTHORIZED,
        BridgeError::InvalidArguments { .. } | BridgeError::Serialization(_) => {
            StatusCode::BAD_REQUEST
        }
        BridgeError::ServerNotFound(_)
        | BridgeError::ToolNotFound(_)
        | BridgeError::PromptNotFound(_) => StatusCode::NOT_FOUND,
        BridgeError::SessionUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        BridgeError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        // Client errors from the backend keep their status.
        BridgeError::Api { status, .. } if (400..500).contains(status) => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        BridgeError::Api { .. }
        | BridgeError::UpstreamParse { .. }
        | BridgeError::Network(_)
        | BridgeError::Transport(_)
        | BridgeError::Mcp { .. } => StatusCode::BAD_GATEWAY,
        BridgeError::Configuration(_)
        | BridgeError::Io(_)
        | BridgeError::InvalidState(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            tracing::error!(error = %err, status = status.as_u16(), "Request failed");
        } else {
            tracing::warn!(error = %err, status = status.as_u16(), "Request rejected");
        }
        Self {
            status,
            envelope: err.to_envelope(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}
