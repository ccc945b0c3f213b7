//! Per-server configuration: transport descriptor plus access-policy lists.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::BridgeError;

/// One configured tool backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(flatten)]
    pub transport: TransportConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_models: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disallowed_models: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disallowed_tools: Option<BTreeSet<String>>,
    #[serde(default)]
    pub disabled: bool,
    /// Seconds allowed for the connect and handshake before the session is
    /// marked failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_timeout_secs: Option<u64>,
}

/// Handshake budget when `startup_timeout_secs` is not set.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

impl ServerConfig {
    /// Unrestricted server config for the given transport.
    pub fn new(transport: TransportConfig) -> Self {
        Self {
            transport,
            allowed_models: None,
            disallowed_models: None,
            allowed_tools: None,
            disallowed_tools: None,
            disabled: false,
            startup_timeout_secs: None,
        }
    }

    /// Subprocess server launched with `command args...`.
    pub fn stdio(command: impl Into<String>, args: Vec<String>) -> Self {
        Self::new(TransportConfig::Stdio(StdioServerConfig {
            command: command.into(),
            args,
            env: BTreeMap::new(),
            cwd: None,
        }))
    }

    /// Remote server reached over Server-Sent Events.
    pub fn sse(url: impl Into<String>) -> Self {
        Self::new(TransportConfig::Sse(SseServerConfig {
            url: url.into(),
            headers: BTreeMap::new(),
        }))
    }

    /// Containerised server started from `image`.
    pub fn container(image: impl Into<String>) -> Self {
        Self::new(TransportConfig::Container(ContainerServerConfig {
            image: image.into(),
            ..Default::default()
        }))
    }

    pub fn with_allowed_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_models = Some(models.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_disallowed_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disallowed_models = Some(models.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_allowed_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_disallowed_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disallowed_tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    /// Mark the server as disabled.
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout_secs = Some(timeout.as_secs().max(1));
        self
    }

    pub fn startup_timeout(&self) -> Duration {
        self.startup_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_STARTUP_TIMEOUT)
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Reject structurally unusable transport descriptors.
    pub fn validate(&self, name: &str) -> Result<(), BridgeError> {
        if self.startup_timeout_secs == Some(0) {
            return Err(BridgeError::Configuration(format!(
                "MCP server '{name}' has a zero `startup_timeout_secs`"
            )));
        }
        let missing = match &self.transport {
            TransportConfig::Stdio(stdio) if stdio.command.trim().is_empty() => Some("command"),
            TransportConfig::Sse(sse) if sse.url.trim().is_empty() => Some("url"),
            TransportConfig::Container(container) if container.image.trim().is_empty() => {
                Some("image")
            }
            _ => None,
        };
        match missing {
            Some(field) => Err(BridgeError::Configuration(format!(
                "MCP server '{name}' has an empty `{field}`"
            ))),
            None => Ok(()),
        }
    }
}

/// Transport descriptor, tagged by the `transport` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum TransportConfig {
    Stdio(StdioServerConfig),
    Sse(SseServerConfig),
    Container(ContainerServerConfig),
}

impl TransportConfig {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Stdio(_) => TransportKind::Stdio,
            Self::Sse(_) => TransportKind::Sse,
            Self::Container(_) => TransportKind::Container,
        }
    }
}

/// Which of the three transports a session uses.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransportKind {
    Stdio,
    Sse,
    Container,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdioServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SseServerConfig {
    pub url: String,
    /// Extra HTTP headers sent with every request (e.g. `Authorization`).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerServerConfig {
    pub image: String,
    /// Arguments appended after the image name.
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Bind mounts in `host:container[:mode]` form.
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(default)]
    pub runtime: ContainerRuntime,
}

/// Container CLI used to launch the server.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ContainerRuntime {
    #[default]
    Docker,
    Podman,
}

/// Server configurations in configuration (document) order.
///
/// Iteration order is the fixed order used for session listing and
/// first-match tool routing, so it must survive deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerMap {
    entries: Vec<(String, ServerConfig)>,
}

impl ServerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a server; names must be unique.
    pub fn insert(&mut self, name: impl Into<String>, config: ServerConfig) -> Result<(), BridgeError> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(BridgeError::Configuration(format!(
                "Duplicate MCP server name '{name}'"
            )));
        }
        self.entries.push((name, config));
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, config: ServerConfig) -> Result<Self, BridgeError> {
        self.insert(name, config)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&ServerConfig> {
        self.entries
            .iter()
            .find(|(entry_name, _)| entry_name == name)
            .map(|(_, config)| config)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServerConfig)> {
        self.entries
            .iter()
            .map(|(name, config)| (name.as_str(), config))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ServerMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, config) in &self.entries {
            map.serialize_entry(name, config)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ServerMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ServerMapVisitor;

        impl<'de> Visitor<'de> for ServerMapVisitor {
            type Value = ServerMap;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of MCP server name to server configuration")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut servers = ServerMap::new();
                while let Some((name, config)) = access.next_entry::<String, ServerConfig>()? {
                    servers
                        .insert(name, config)
                        .map_err(serde::de::Error::custom)?;
                }
                Ok(servers)
            }
        }

        deserializer.deserialize_map(ServerMapVisitor)
    }
}
