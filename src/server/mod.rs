//! OpenAI-compatible HTTP surface.
//!
//! # Endpoints
//!
//! - `GET /health` - liveness, never authenticated
//! - `POST /v1/chat/completions` (and `/chat/completions`) - run the tool loop
//! - `GET /mcp/servers` - session status per configured server
//! - `GET /mcp/tools?model=` - tools visible to a model
//! - `GET /mcp/prompts?model=` - prompts visible to a model

mod auth;
mod error;
mod routes;

pub use auth::{extract_api_key, is_authorized};
pub use error::{status_for, ApiError};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::agent_loop::Orchestrator;
use crate::config::{BridgeConfig, CorsConfig, SecurityConfig};
use crate::error::BridgeError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    api_keys: Arc<Vec<String>>,
    log_server_pings: bool,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, config: &BridgeConfig) -> Self {
        Self {
            orchestrator,
            api_keys: Arc::new(
                config
                    .security
                    .auth
                    .api_keys
                    .iter()
                    .map(|k| k.key.clone())
                    .collect(),
            ),
            log_server_pings: config.logging.log_server_pings,
        }
    }
}

/// Build the application router.
pub fn router(state: AppState, security: &SecurityConfig) -> Router {
    let api = Router::new()
        .route("/v1/chat/completions", post(routes::chat_completions))
        .route("/chat/completions", post(routes::chat_completions))
        .route("/mcp/servers", get(routes::list_servers))
        .route("/mcp/tools", get(routes::list_tools))
        .route("/mcp/prompts", get(routes::list_prompts));

    let api = if security.auth.enabled {
        tracing::info!(keys = state.api_keys.len(), "API key authentication enabled");
        api.layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::api_key_auth,
        ))
    } else {
        api
    };

    let app = Router::new()
        .route("/health", get(routes::health))
        .merge(api)
        .layer(TraceLayer::new_for_http());

    let app = if security.cors.enabled {
        app.layer(cors_layer(&security.cors))
    } else {
        app
    };

    app.with_state(state)
}

fn is_wildcard(values: &[String]) -> bool {
    values.iter().any(|v| v.trim() == "*")
}

/// Translate the CORS settings. Wildcards are mirrored when credentials are allowed.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let credentials = config.allow_credentials;

    let origins = if is_wildcard(&config.allow_origins) {
        if credentials {
            AllowOrigin::mirror_request()
        } else {
            AllowOrigin::from(Any)
        }
    } else {
        AllowOrigin::list(parse_values::<HeaderValue>(&config.allow_origins, "origin"))
    };

    let methods = if is_wildcard(&config.allow_methods) {
        if credentials {
            AllowMethods::mirror_request()
        } else {
            AllowMethods::from(Any)
        }
    } else {
        AllowMethods::list(parse_values::<Method>(&config.allow_methods, "method"))
    };

    let headers = if is_wildcard(&config.allow_headers) {
        if credentials {
            AllowHeaders::mirror_request()
        } else {
            AllowHeaders::from(Any)
        }
    } else {
        AllowHeaders::list(parse_values::<HeaderName>(&config.allow_headers, "header"))
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(credentials)
}

fn parse_values<T: std::str::FromStr>(values: &[String], what: &str) -> Vec<T> {
    values
        .iter()
        .filter_map(|value| match value.trim().parse::<T>() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                tracing::warn!(%value, kind = what, "Ignoring invalid CORS entry");
                None
            }
        })
        .collect()
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve<F>(config: &BridgeConfig, state: AppState, shutdown: F) -> Result<(), BridgeError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", config.network.host, config.network.port);
    let listener = TcpListener::bind(&addr).await?;
    let local: SocketAddr = listener.local_addr()?;
    tracing::info!(%local, "Listening");

    let app = router(state, &config.security);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
