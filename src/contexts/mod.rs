mod agent_client;
mod claude_client;
mod instruction;
mod renderer;
mod workflow_runner;

pub use agent_client::{AgentClient, AgentRequest, ClientError, EventStream, PermissionMode};
pub use claude_client::ClaudeCliClient;
pub use instruction::{
    DEFAULT_INSTRUCTION_TEMPLATE, InstructionInput, PopulateError, build_instruction, populate,
};
pub use renderer::EventRenderer;
pub use workflow_runner::{RunnerError, WorkflowRunner};
