use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const REDACTED: &str = "********";

/// Launch description for one MCP tool provider process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolProvider {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl ToolProvider {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Named tool providers, serialized in the shape the agent runtime expects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(rename = "mcpServers")]
    pub servers: BTreeMap<String, ToolProvider>,
}

impl McpConfig {
    pub fn with_provider(mut self, name: impl Into<String>, provider: ToolProvider) -> Self {
        self.servers.insert(name.into(), provider);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.servers.keys().map(String::as_str)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Copy with every env value masked and `secrets` masked inside args
    pub fn redacted(&self, secrets: &[String]) -> Self {
        let mask = |value: &str| {
            secrets
                .iter()
                .filter(|s| !s.is_empty())
                .fold(value.to_string(), |acc, s| acc.replace(s.as_str(), REDACTED))
        };

        let servers = self
            .servers
            .iter()
            .map(|(name, provider)| {
                let redacted = ToolProvider {
                    command: provider.command.clone(),
                    args: provider.args.iter().map(|a| mask(a)).collect(),
                    env: provider
                        .env
                        .keys()
                        .map(|k| (k.clone(), REDACTED.to_string()))
                        .collect(),
                };
                (name.clone(), redacted)
            })
            .collect();
        Self { servers }
    }
}
