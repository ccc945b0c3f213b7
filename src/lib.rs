//! mcp-bridge: an OpenAI-compatible chat-completion gateway that executes
//! tool calls against MCP servers.
//!
//! A request comes in on `/v1/chat/completions`, the tools of every MCP
//! server the model may use are attached to it, and the conversation is
//! forwarded to the inference backend. Tool calls in the response are routed
//! to the owning server, their results appended, and the backend called again
//! until it produces a final answer.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mcp_bridge::agent_loop::Orchestrator;
//! use mcp_bridge::config::BridgeConfig;
//! use mcp_bridge::inference::HttpChatBackend;
//! use mcp_bridge::mcp::SessionManager;
//! use mcp_bridge::openai::{ChatCompletionRequest, ChatMessage};
//!
//! # async fn example() -> mcp_bridge::error::Result<()> {
//! let config = BridgeConfig::load(None)?;
//! let manager = Arc::new(SessionManager::initialize(&config.mcp_servers).await);
//! let backend = Arc::new(HttpChatBackend::new(&config.inference_server)?);
//! let orchestrator = Orchestrator::new(manager, backend, &config.agent_loop);
//!
//! let request = ChatCompletionRequest::new("gpt-x", vec![ChatMessage::user("What time is it?")]);
//! let response = orchestrator.run(request).await?;
//! println!("{:?}", response.choices[0].message.text());
//! # Ok(())
//! # }
//! ```

pub mod agent_loop;
pub mod config;
pub mod error;
pub mod inference;
pub mod mcp;
pub mod openai;
pub mod policy;
pub mod router;
pub mod util;

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "server")]
pub mod telemetry;

#[cfg(feature = "cli")]
pub mod cli;

pub use agent_loop::Orchestrator;
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use mcp::SessionManager;
pub use router::ToolRouter;
