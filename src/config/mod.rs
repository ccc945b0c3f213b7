//! Bridge configuration (layered: file > environment overrides > CLI flags).
//!
//! The configuration is loaded once at process start and is immutable
//! afterwards; there is no hot reload.

pub mod server;

pub use server::{
    ContainerRuntime, DEFAULT_STARTUP_TIMEOUT, ContainerServerConfig, ServerConfig, ServerMap, SseServerConfig,
    StdioServerConfig, TransportConfig, TransportKind,
};

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Prefix for environment overrides, nested with `__`.
pub const ENV_PREFIX: &str = "MCP_BRIDGE__";
/// Environment variable naming the configuration file.
pub const CONFIG_FILE_ENV: &str = "MCP_BRIDGE__CONFIG_FILE";
const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Top-level settings consumed by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub inference_server: InferenceServerConfig,
    pub mcp_servers: ServerMap,
    pub logging: LoggingConfig,
    pub network: NetworkConfig,
    pub security: SecurityConfig,
    pub agent_loop: AgentLoopConfig,
}

/// Upstream OpenAI-compatible inference endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceServerConfig {
    pub base_url: String,
    pub api_key: String,
    /// Whole-request budget for one backend call, in seconds.
    pub request_timeout_secs: u64,
}

impl InferenceServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for InferenceServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            api_key: "unauthenticated".to_string(),
            request_timeout_secs: 300,
        }
    }
}

impl fmt::Debug for InferenceServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceServerConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"..")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    #[default]
    #[serde(alias = "INFO")]
    Info,
    #[serde(alias = "DEBUG")]
    Debug,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: LogLevel,
    /// Log `/health` probes at info level.
    pub log_server_pings: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub host: String,
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    #[serde(alias = "CORS")]
    pub cors: CorsConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allow_origins: Vec<String>,
    pub allow_credentials: bool,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        let any = vec!["*".to_string()];
        Self {
            enabled: true,
            allow_origins: any.clone(),
            allow_credentials: true,
            allow_methods: any.clone(),
            allow_headers: any,
        }
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    pub api_keys: Vec<ApiKey>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("enabled", &self.enabled)
            .field("api_keys", &self.api_keys.len())
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    pub key: String,
}

/// Knobs for the conversation loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentLoopConfig {
    /// Upper bound on inference round-trips per request; unbounded when unset.
    pub max_iterations: Option<usize>,
    /// Timeout forwarded to each tool invocation.
    pub tool_timeout_secs: Option<u64>,
    /// Emit a synthetic error tool message when a tool call cannot be routed.
    pub fill_missing_tool_results: bool,
}

impl BridgeConfig {
    /// Load `.env`, the configuration file and environment overrides.
    ///
    /// `path` falls back to `MCP_BRIDGE__CONFIG_FILE`, then `config.json`.
    /// A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, BridgeError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error

        let path = match path {
            Some(path) => path.to_path_buf(),
            None => std::env::var_os(CONFIG_FILE_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
        };

        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a `.json` or `.toml` configuration file.
    pub fn from_file(path: &Path) -> Result<Self, BridgeError> {
        let raw = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            toml::from_str(&raw).map_err(|e| {
                BridgeError::Configuration(format!("Invalid TOML in {}: {e}", path.display()))
            })
        } else {
            serde_json::from_str(&raw).map_err(|e| {
                BridgeError::Configuration(format!("Invalid JSON in {}: {e}", path.display()))
            })
        }
    }

    /// Apply `MCP_BRIDGE__SECTION__KEY` overrides for scalar settings.
    pub fn apply_env_overrides<I>(&mut self, vars: I) -> Result<(), BridgeError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(setting) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match setting.to_ascii_uppercase().as_str() {
                "INFERENCE_SERVER__BASE_URL" => self.inference_server.base_url = value,
                "INFERENCE_SERVER__API_KEY" => self.inference_server.api_key = value,
                "INFERENCE_SERVER__REQUEST_TIMEOUT_SECS" => {
                    self.inference_server.request_timeout_secs = parse_env(&key, &value)?
                }
                "NETWORK__HOST" => self.network.host = value,
                "NETWORK__PORT" => self.network.port = parse_env(&key, &value)?,
                "LOGGING__LOG_LEVEL" => self.logging.log_level = parse_env(&key, &value)?,
                "LOGGING__LOG_SERVER_PINGS" => {
                    self.logging.log_server_pings = parse_env(&key, &value)?
                }
                "SECURITY__AUTH__ENABLED" => self.security.auth.enabled = parse_env(&key, &value)?,
                "SECURITY__CORS__ENABLED" => self.security.cors.enabled = parse_env(&key, &value)?,
                "AGENT_LOOP__MAX_ITERATIONS" => {
                    self.agent_loop.max_iterations = Some(parse_env(&key, &value)?)
                }
                "AGENT_LOOP__TOOL_TIMEOUT_SECS" => {
                    self.agent_loop.tool_timeout_secs = Some(parse_env(&key, &value)?)
                }
                "CONFIG_FILE" => {}
                _ => tracing::debug!(key = %key, "Ignoring unknown configuration override"),
            }
        }
        Ok(())
    }

    /// Structural validation. Allow/disallow overlaps are left to the
    /// policy resolver, which reports them per request.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.inference_server.base_url.trim().is_empty() {
            return Err(BridgeError::Configuration(
                "inference_server.base_url must not be empty".into(),
            ));
        }
        if self.inference_server.request_timeout_secs == 0 {
            return Err(BridgeError::Configuration(
                "inference_server.request_timeout_secs must be greater than zero".into(),
            ));
        }
        for (name, server) in self.mcp_servers.iter() {
            if name.trim().is_empty() {
                return Err(BridgeError::Configuration(
                    "MCP server name must not be empty".into(),
                ));
            }
            server.validate(name)?;
        }
        if self.security.auth.enabled && self.security.auth.api_keys.is_empty() {
            return Err(BridgeError::Configuration(
                "security.auth is enabled but no api_keys are configured".into(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T, BridgeError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| BridgeError::Configuration(format!("Invalid value for {key}: {e}")))
}
