//! Process-wide configuration for a retention run
//!
//! Everything the runner needs from the environment is read once here and
//! handed to the rest of the crate as an explicit `RunnerConfig`.

use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const SUPABASE_PROJECT_ID: &str = "SUPABASE_PROJECT_ID";
pub const SUPABASE_ACCESS_TOKEN: &str = "SUPABASE_ACCESS_TOKEN";
pub const KUMO_API_KEY: &str = "KUMO_API_KEY";
pub const KUMO_API_URL: &str = "KUMO_API_URL";
pub const KUMO_MCP_PYTHON: &str = "KUMO_MCP_PYTHON";
pub const CLAUDE_CLI_PATH: &str = "CLAUDE_CLI_PATH";
pub const DATA_DIR: &str = "RETAIN_DATA_DIR";
pub const OUTPUT_DIR: &str = "RETAIN_OUTPUT_DIR";
pub const DATA_FILES: &str = "RETAIN_DATA_FILES";

const DEFAULT_KUMO_API_URL: &str = "https://kumorfm.ai/api";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_OUTPUT_DIR: &str = ".";
const DEFAULT_DATA_FILES: &[&str] = &[
    "agents.csv",
    "policies.csv",
    "customers.csv",
    "pets.csv",
    "products.csv",
    "properties.csv",
    "vehicles.csv",
];

/// Name of the file the agent is asked to produce in the output directory
pub const OUTPUT_FILE_NAME: &str = "emails.json";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),
    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// Credentials for the two tool providers
#[derive(Debug, Clone)]
pub struct Credentials {
    pub supabase_project_id: String,
    pub supabase_access_token: SecretString,
    pub kumo_api_key: SecretString,
}

/// Limits applied to a single run. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunBudget {
    pub max_turns: Option<u32>,
    pub timeout: Option<Duration>,
}

impl RunBudget {
    pub fn new(max_turns: Option<u32>, timeout_secs: Option<u64>) -> Self {
        Self {
            max_turns,
            timeout: timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Where the agent reads its inputs and writes its output
///
/// Needs no credentials, so the instruction can be built on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub data_files: Vec<String>,
}

impl DataLayout {
    /// Loads `.env` if present, then reads the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(&|name: &str| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_files = match lookup(DATA_FILES) {
            Some(raw) if !raw.trim().is_empty() => parse_file_list(&raw)?,
            _ => DEFAULT_DATA_FILES.iter().map(|s| s.to_string()).collect(),
        };

        Ok(Self {
            data_dir: PathBuf::from(optional(lookup, DATA_DIR, DEFAULT_DATA_DIR)),
            output_dir: PathBuf::from(optional(lookup, OUTPUT_DIR, DEFAULT_OUTPUT_DIR)),
            data_files,
        })
    }

    /// Path the agent is told to write its emails to
    pub fn output_file(&self) -> PathBuf {
        self.output_dir.join(OUTPUT_FILE_NAME)
    }

    /// Configured data files that do not exist under the data directory
    pub fn missing_data_files(&self) -> Vec<String> {
        missing_files(&self.data_dir, &self.data_files)
    }
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub credentials: Credentials,
    pub layout: DataLayout,
    pub claude_command: String,
    pub kumo_mcp_command: String,
    pub kumo_api_url: String,
    pub budget: RunBudget,
}

impl RunnerConfig {
    /// Loads `.env` if present, then reads the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    ///
    /// Blank values count as missing for required variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingVar(name))
        };

        let credentials = Credentials {
            supabase_project_id: required(SUPABASE_PROJECT_ID)?,
            supabase_access_token: SecretString::from(required(SUPABASE_ACCESS_TOKEN)?),
            kumo_api_key: SecretString::from(required(KUMO_API_KEY)?),
        };

        Ok(Self {
            credentials,
            layout: DataLayout::from_lookup(&lookup)?,
            claude_command: optional(&lookup, CLAUDE_CLI_PATH, "claude"),
            kumo_mcp_command: optional(&lookup, KUMO_MCP_PYTHON, "python3"),
            kumo_api_url: optional(&lookup, KUMO_API_URL, DEFAULT_KUMO_API_URL),
            budget: RunBudget::default(),
        })
    }

    pub fn with_budget(mut self, budget: RunBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Looks up a configuration value by its environment variable name
    pub fn variable(&self, name: &str) -> Option<String> {
        let creds = &self.credentials;
        let value = match name {
            SUPABASE_PROJECT_ID => creds.supabase_project_id.clone(),
            SUPABASE_ACCESS_TOKEN => creds.supabase_access_token.expose_secret().to_string(),
            KUMO_API_KEY => creds.kumo_api_key.expose_secret().to_string(),
            KUMO_API_URL => self.kumo_api_url.clone(),
            KUMO_MCP_PYTHON => self.kumo_mcp_command.clone(),
            DATA_DIR => self.layout.data_dir.display().to_string(),
            OUTPUT_DIR => self.layout.output_dir.display().to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Whether a variable name refers to a secret
    pub fn is_secret(name: &str) -> bool {
        matches!(name, SUPABASE_ACCESS_TOKEN | KUMO_API_KEY)
    }
}

fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "ignoring unreadable .env file");
        }
    }
}

fn optional<F>(lookup: &F, name: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Comma-separated names; spaces inside a name are kept
fn parse_file_list(raw: &str) -> Result<Vec<String>, ConfigError> {
    let files: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if let Some(bad) = files.iter().find(|f| f.contains('/') || f.contains('\\')) {
        return Err(ConfigError::InvalidValue {
            name: DATA_FILES,
            reason: format!("'{}' must be a bare file name", bad),
        });
    }
    Ok(files)
}

fn missing_files(dir: &Path, files: &[String]) -> Vec<String> {
    files
        .iter()
        .filter(|name| !dir.join(name).is_file())
        .cloned()
        .collect()
}
