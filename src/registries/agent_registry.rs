use std::fs;
use std::path::PathBuf;

use super::{AgentRegistry, RegistryError};
use crate::contexts::DEFAULT_INSTRUCTION_TEMPLATE;

/// Persona given to the agent when no profile file overrides it
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that helps insurance companies forecast customer retention using the tools available to you.";

/// System persona and instruction template for the retention agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProfile {
    pub system_prompt: String,
    pub instruction_template: String,
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            instruction_template: DEFAULT_INSTRUCTION_TEMPLATE.to_string(),
        }
    }
}

/// File-based implementation of AgentRegistry
/// Loads the agent profile from a YAML file, falling back to the built-in one
#[derive(Clone)]
pub struct FileAgentRegistry {
    profile_path: PathBuf,
}

impl FileAgentRegistry {
    /// Creates a new FileAgentRegistry
    ///
    /// # Arguments
    /// * `profile_path` - Optional path to the profile (defaults to "agents/retention.yml")
    pub fn new(profile_path: Option<PathBuf>) -> Self {
        Self {
            profile_path: profile_path.unwrap_or_else(|| PathBuf::from("agents/retention.yml")),
        }
    }
}

impl AgentRegistry for FileAgentRegistry {
    fn profile(&self) -> Result<AgentProfile, RegistryError> {
        if !self.profile_path.exists() {
            tracing::debug!(path = %self.profile_path.display(), "no agent profile, using built-in");
            return Ok(AgentProfile::default());
        }

        let content = fs::read_to_string(&self.profile_path).map_err(|source| {
            RegistryError::Read {
                path: self.profile_path.clone(),
                source,
            }
        })?;
        parse_profile(&content).map_err(|reason| RegistryError::Invalid {
            path: self.profile_path.clone(),
            reason,
        })
    }
}

/// Extracts `system_prompt` (required) and `instruction` (optional) from a profile
fn parse_profile(yaml_content: &str) -> Result<AgentProfile, String> {
    use yaml_rust::YamlLoader;

    let docs = YamlLoader::load_from_str(yaml_content).map_err(|e| format!("Invalid YAML: {}", e))?;
    let doc = docs.first().ok_or_else(|| "Empty YAML document".to_string())?;

    let system_prompt = doc["system_prompt"]
        .as_str()
        .ok_or_else(|| "No system_prompt field found in agent profile".to_string())?;

    let instruction_template = doc["instruction"]
        .as_str()
        .unwrap_or(DEFAULT_INSTRUCTION_TEMPLATE);

    Ok(AgentProfile {
        system_prompt: system_prompt.trim().to_string(),
        instruction_template: instruction_template.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profile_with_instruction() {
        let yaml = r#"
name: retention
system_prompt: |
  You forecast churn.
instruction: |
  Read {{input.file_names}} from {{input.data_dir}}.
"#;

        let profile = parse_profile(yaml).unwrap();
        assert_eq!(profile.system_prompt, "You forecast churn.");
        assert!(profile.instruction_template.contains("{{input.file_names}}"));
    }

    #[test]
    fn test_parse_profile_defaults_instruction() {
        let profile = parse_profile("system_prompt: Be brief.").unwrap();
        assert_eq!(profile.system_prompt, "Be brief.");
        assert_eq!(profile.instruction_template, DEFAULT_INSTRUCTION_TEMPLATE);
    }

    #[test]
    fn test_parse_profile_missing_system_prompt() {
        let result = parse_profile("name: retention\n");
        assert!(result.unwrap_err().contains("system_prompt"));
    }

    #[test]
    fn test_missing_file_uses_builtin_profile() {
        let registry = FileAgentRegistry::new(Some(PathBuf::from("/nonexistent/retention.yml")));
        assert_eq!(registry.profile().unwrap(), AgentProfile::default());
    }

    #[test]
    fn test_profile_loaded_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("retention.yml");
        fs::write(&path, "system_prompt: From file\n").unwrap();

        let profile = FileAgentRegistry::new(Some(path)).profile().unwrap();
        assert_eq!(profile.system_prompt, "From file");
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("retention.yml");
        fs::write(&path, "system_prompt: [unclosed\n").unwrap();

        let err = FileAgentRegistry::new(Some(path.clone())).profile().unwrap_err();
        assert!(matches!(err, RegistryError::Invalid { path: p, .. } if p == path));
    }
}
