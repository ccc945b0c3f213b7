//! OpenAI chat-completion wire types.
//!
//! Only the fields the bridge acts on are typed; everything else is carried
//! through untouched in `extra`.

mod tools;
mod types;

pub use tools::{ChatTool, FunctionDefinition};
pub use types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Choice, ContentPart, FinishReason,
    FunctionCall, MessageContent, Role, ToolCall,
};
