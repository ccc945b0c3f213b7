//! Access policy resolution over (server, model, tool).
//!
//! Pure decisions: callers log and act on the outcome. A name listed in both
//! an allow list and a disallow list is reported as a conflict, never resolved
//! by precedence.

use std::collections::BTreeSet;

use crate::config::ServerConfig;

/// Outcome of a policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow,
    Deny(String),
    /// Allow/disallow overlap. Treated as deny, reported separately.
    ConfigConflict(String),
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConfigConflict(_))
    }

    /// Human-readable reason for a non-allow decision.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Allow => None,
            Self::Deny(reason) | Self::ConfigConflict(reason) => Some(reason),
        }
    }
}

fn non_empty(set: &Option<BTreeSet<String>>) -> Option<&BTreeSet<String>> {
    set.as_ref().filter(|set| !set.is_empty())
}

/// Generic allow/disallow check shared by the model and tool levels.
fn check_lists(
    kind: &str,
    name: &str,
    allowed: &Option<BTreeSet<String>>,
    disallowed: &Option<BTreeSet<String>>,
) -> PolicyDecision {
    let allowed = non_empty(allowed);
    let disallowed = non_empty(disallowed);

    if let (Some(allowed), Some(disallowed)) = (allowed, disallowed) {
        if allowed.contains(name) && disallowed.contains(name) {
            return PolicyDecision::ConfigConflict(format!(
                "{kind} '{name}' is both allowed and disallowed"
            ));
        }
    }
    if let Some(allowed) = allowed {
        if !allowed.contains(name) {
            return PolicyDecision::Deny(format!("{kind} '{name}' is not in the allowed list"));
        }
    }
    if let Some(disallowed) = disallowed {
        if disallowed.contains(name) {
            return PolicyDecision::Deny(format!("{kind} '{name}' is disallowed"));
        }
    }
    PolicyDecision::Allow
}

/// Model-level decision for one server.
pub fn check_model(config: &ServerConfig, model: &str) -> PolicyDecision {
    check_lists(
        "model",
        model,
        &config.allowed_models,
        &config.disallowed_models,
    )
}

/// Members shared by `allowed_tools` and `disallowed_tools`, in sorted order.
pub fn tool_list_overlap(config: &ServerConfig) -> Vec<String> {
    match (
        non_empty(&config.allowed_tools),
        non_empty(&config.disallowed_tools),
    ) {
        (Some(allowed), Some(disallowed)) => allowed.intersection(disallowed).cloned().collect(),
        _ => Vec::new(),
    }
}

/// Tool-level decision for one server.
///
/// Any overlap between the tool lists flags the whole server, whichever tool
/// is being checked.
pub fn check_tool(config: &ServerConfig, tool: &str) -> PolicyDecision {
    let overlap = tool_list_overlap(config);
    if !overlap.is_empty() {
        return PolicyDecision::ConfigConflict(format!(
            "tools [{}] are both allowed and disallowed",
            overlap.join(", ")
        ));
    }
    check_lists(
        "tool",
        tool,
        &config.allowed_tools,
        &config.disallowed_tools,
    )
}

/// Whether `tool` on this server is usable for `model`.
///
/// The model check runs first; a conflict or deny there short-circuits.
/// Without a model only the tool level applies.
pub fn check(config: &ServerConfig, model: Option<&str>, tool: &str) -> PolicyDecision {
    if let Some(model) = model {
        let decision = check_model(config, model);
        if !decision.is_allowed() {
            return decision;
        }
    }
    check_tool(config, tool)
}
