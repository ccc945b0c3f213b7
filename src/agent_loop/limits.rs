use std::time::Duration;

use crate::config::AgentLoopConfig;
use crate::error::BridgeError;

/// Environment override for the iteration ceiling when the config leaves it unset.
pub const MAX_ITERATIONS_ENV: &str = "MCP_BRIDGE_MAX_ITERATIONS";

/// Per-run bounds. Unbounded unless configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopLimits {
    pub max_iterations: Option<usize>,
    pub tool_timeout: Option<Duration>,
}

impl LoopLimits {
    pub fn from_config(config: &AgentLoopConfig) -> Self {
        let env = std::env::var(MAX_ITERATIONS_ENV).ok();
        Self::resolve(config, env.as_deref())
    }

    fn resolve(config: &AgentLoopConfig, env_max_iterations: Option<&str>) -> Self {
        let max_iterations = config
            .max_iterations
            .filter(|&max| max > 0)
            .or_else(|| env_max_iterations.and_then(parse_positive_usize));
        Self {
            max_iterations,
            tool_timeout: config
                .tool_timeout_secs
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs),
        }
    }

    /// Fail once `iteration` (1-based) exceeds the ceiling.
    pub fn check(&self, iteration: usize) -> Result<(), BridgeError> {
        match self.max_iterations {
            Some(max) if iteration > max => Err(BridgeError::InvalidState(format!(
                "conversation exceeded {max} inference round-trips"
            ))),
            _ => Ok(()),
        }
    }
}

fn parse_positive_usize(value: &str) -> Option<usize> {
    let parsed = value.trim().parse::<usize>().ok()?;
    if parsed == 0 {
        None
    } else {
        Some(parsed)
    }
}
