use serde::{Deserialize, Serialize};

use crate::mcp::ToolDescriptor;

/// Function tool as advertised in a chat-completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

impl From<&ToolDescriptor> for ChatTool {
    fn from(tool: &ToolDescriptor) -> Self {
        Self {
            kind: "function".to_string(),
            function: FunctionDefinition {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: Some(tool.input_schema.clone()),
            },
        }
    }
}

impl From<ToolDescriptor> for ChatTool {
    fn from(tool: ToolDescriptor) -> Self {
        Self {
            kind: "function".to_string(),
            function: FunctionDefinition {
                name: tool.name,
                description: tool.description,
                parameters: Some(tool.input_schema),
            },
        }
    }
}
