//! Model Context Protocol (MCP) sessions over stdio, SSE and container transports.

pub mod manager;
pub mod schema;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use manager::{ServerPrompt, ServerTool, Session, SessionManager, SessionState, SessionStatus};
pub use schema::{PromptArgument, PromptDescriptor, ToolContent, ToolDescriptor, ToolResult};
pub use transport::{JsonObject, ToolSession};
