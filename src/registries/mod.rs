mod agent_registry;
mod tool_provider_registry;

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::RunnerConfig;
use crate::data::McpConfig;

pub use agent_registry::{AgentProfile, DEFAULT_SYSTEM_PROMPT, FileAgentRegistry};
pub use tool_provider_registry::{FileToolProviderRegistry, default_providers};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid registry file {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },
    #[error("tool provider '{provider}' references unknown variable ${{{name}}}")]
    UnknownVariable { provider: String, name: String },
}

/// Trait for loading the agent's persona and instruction template
pub trait AgentRegistry {
    fn profile(&self) -> Result<AgentProfile, RegistryError>;
}

/// Trait for resolving the tool providers registered with the agent
pub trait ToolProviderRegistry {
    fn providers(&self, config: &RunnerConfig) -> Result<McpConfig, RegistryError>;
}
