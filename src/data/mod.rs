mod events;
mod tool_provider;

pub use events::{
    AgentEvent, AssistantBody, AssistantMessage, ContentBlock, ResultMessage, SystemMessage,
    UserMessage,
};
pub use tool_provider::{McpConfig, ToolProvider};
