use regex::Regex;
use secrecy::ExposeSecret;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use super::{RegistryError, ToolProviderRegistry};
use crate::config::{KUMO_API_KEY, KUMO_API_URL, RunnerConfig, SUPABASE_ACCESS_TOKEN};
use crate::data::{McpConfig, ToolProvider};

/// File-based implementation of ToolProviderRegistry
///
/// The file maps provider names to `{command, args, env}`. `${NAME}` inside
/// args and env values is replaced from the runner configuration.
#[derive(Clone)]
pub struct FileToolProviderRegistry {
    registry_path: PathBuf,
}

impl FileToolProviderRegistry {
    /// Creates a new FileToolProviderRegistry
    ///
    /// # Arguments
    /// * `registry_path` - Optional path to registry file (defaults to "agents/tool_providers.yml")
    pub fn new(registry_path: Option<PathBuf>) -> Self {
        Self {
            registry_path: registry_path
                .unwrap_or_else(|| PathBuf::from("agents/tool_providers.yml")),
        }
    }
}

impl ToolProviderRegistry for FileToolProviderRegistry {
    fn providers(&self, config: &RunnerConfig) -> Result<McpConfig, RegistryError> {
        if !self.registry_path.exists() {
            tracing::debug!(path = %self.registry_path.display(), "no provider table, using built-in");
            return Ok(default_providers(config));
        }

        let content = fs::read_to_string(&self.registry_path).map_err(|source| {
            RegistryError::Read {
                path: self.registry_path.clone(),
                source,
            }
        })?;
        let raw: BTreeMap<String, ToolProvider> =
            serde_yaml::from_str(&content).map_err(|e| RegistryError::Invalid {
                path: self.registry_path.clone(),
                reason: e.to_string(),
            })?;

        let mut mcp = McpConfig::default();
        for (name, provider) in raw {
            let expanded = expand_provider(&name, provider, config)?;
            mcp = mcp.with_provider(name, expanded);
        }
        Ok(mcp)
    }
}

/// Database and prediction providers the retention workflow relies on
pub fn default_providers(config: &RunnerConfig) -> McpConfig {
    let creds = &config.credentials;

    let supabase = ToolProvider::new("npx")
        .arg("-y")
        .arg("@supabase/mcp-server-supabase@latest")
        .arg("--read-only")
        .arg(format!("--project-ref={}", creds.supabase_project_id))
        .env(SUPABASE_ACCESS_TOKEN, creds.supabase_access_token.expose_secret());

    let kumo = ToolProvider::new(config.kumo_mcp_command.clone())
        .arg("-m")
        .arg("kumo_rfm_mcp.server")
        .env(KUMO_API_KEY, creds.kumo_api_key.expose_secret())
        .env(KUMO_API_URL, config.kumo_api_url.clone());

    McpConfig::default()
        .with_provider("supabase", supabase)
        .with_provider("kumo-rfm", kumo)
}

fn variable_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid variable regex"))
}

fn expand_provider(
    name: &str,
    provider: ToolProvider,
    config: &RunnerConfig,
) -> Result<ToolProvider, RegistryError> {
    let args = provider
        .args
        .iter()
        .map(|arg| expand(name, arg, config))
        .collect::<Result<Vec<_>, _>>()?;
    let env = provider
        .env
        .iter()
        .map(|(key, value)| Ok((key.clone(), expand(name, value, config)?)))
        .collect::<Result<BTreeMap<_, _>, RegistryError>>()?;

    Ok(ToolProvider {
        command: expand(name, &provider.command, config)?,
        args,
        env,
    })
}

fn expand(provider: &str, value: &str, config: &RunnerConfig) -> Result<String, RegistryError> {
    let mut out = String::with_capacity(value.len());
    let mut last = 0;

    for caps in variable_re().captures_iter(value) {
        let (Some(whole), Some(var)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let replacement =
            config
                .variable(var.as_str())
                .ok_or_else(|| RegistryError::UnknownVariable {
                    provider: provider.to_string(),
                    name: var.as_str().to_string(),
                })?;
        out.push_str(&value[last..whole.start()]);
        out.push_str(&replacement);
        last = whole.end();
    }
    out.push_str(&value[last..]);
    Ok(out)
}
