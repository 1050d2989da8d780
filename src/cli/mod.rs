use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use std::io;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod report;

use report::print_run_summary;
use retain::config::{DataLayout, RunBudget, RunnerConfig};
use retain::contexts::{
    AgentRequest, ClaudeCliClient, EventRenderer, InstructionInput, PermissionMode,
    WorkflowRunner, populate,
};
use retain::data::McpConfig;
use retain::registries::{
    AgentProfile, AgentRegistry, FileAgentRegistry, FileToolProviderRegistry,
    ToolProviderRegistry,
};

#[derive(Clone, Copy)]
pub struct Config {
    pub verbose: bool,
    pub dry_run: bool,
}

pub struct RunOptions {
    pub max_turns: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub summary: Option<PathBuf>,
    pub agent: Option<PathBuf>,
    pub providers: Option<PathBuf>,
    pub permission_mode: PermissionMode,
    pub notes: Option<String>,
}

pub async fn run(options: RunOptions, config: &Config) -> Result<()> {
    let runner_config = load_config()?
        .with_budget(RunBudget::new(options.max_turns, options.timeout_secs));
    warn_missing_data_files(&runner_config.layout);

    let profile = FileAgentRegistry::new(options.agent)
        .profile()
        .context("Failed to load agent profile")?;
    let instruction = build_instruction(&runner_config.layout, &profile, options.notes)?;
    let mcp_config = FileToolProviderRegistry::new(options.providers)
        .providers(&runner_config)
        .context("Failed to load tool providers")?;

    if config.dry_run {
        println!("{}", instruction);
        println!("{}", "=".repeat(60));
        println!("{}", redacted_json(&mcp_config, &runner_config)?);
        return Ok(());
    }

    let request = AgentRequest {
        prompt: instruction,
        system_prompt: profile.system_prompt,
        mcp_config,
        max_turns: runner_config.budget.max_turns,
        permission_mode: options.permission_mode,
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let runner = WorkflowRunner::new(
        ClaudeCliClient::new(runner_config.claude_command.clone()),
        runner_config.budget,
        cancel,
    );
    let mut renderer = EventRenderer::new(io::stdout());
    let summary = runner
        .run(request, &mut renderer)
        .await
        .context("Agent run failed")?;

    if config.verbose {
        print_run_summary(&summary);
    }
    if let Some(path) = &options.summary {
        summary.save(path)?;
        info!(path = %path.display(), "run summary written");
    }

    if !summary.succeeded() {
        anyhow::bail!(
            "Run did not complete successfully (outcome: {}, result: {})",
            summary
                .outcome
                .map_or_else(|| "unknown".to_string(), |outcome| outcome.to_string()),
            summary.result_subtype.as_deref().unwrap_or("none")
        );
    }
    Ok(())
}

/// Prints the instruction; only the data layout is read, no credentials
pub fn show_prompt(agent: Option<PathBuf>, notes: Option<String>) -> Result<()> {
    let layout = DataLayout::from_env().context("Failed to load data layout from the environment")?;
    warn_missing_data_files(&layout);

    let profile = FileAgentRegistry::new(agent)
        .profile()
        .context("Failed to load agent profile")?;
    println!("{}", build_instruction(&layout, &profile, notes)?);
    Ok(())
}

pub fn show_providers(providers: Option<PathBuf>) -> Result<()> {
    let runner_config = load_config()?;
    let mcp_config = FileToolProviderRegistry::new(providers)
        .providers(&runner_config)
        .context("Failed to load tool providers")?;
    println!("{}", redacted_json(&mcp_config, &runner_config)?);
    Ok(())
}

fn load_config() -> Result<RunnerConfig> {
    RunnerConfig::from_env().context("Failed to load configuration from the environment")
}

fn warn_missing_data_files(layout: &DataLayout) {
    for name in layout.missing_data_files() {
        warn!(
            file = %name,
            data_dir = %layout.data_dir.display(),
            "expected data file not found"
        );
    }
}

fn build_instruction(
    layout: &DataLayout,
    profile: &AgentProfile,
    notes: Option<String>,
) -> Result<String> {
    let mut input = InstructionInput::new(&layout.data_dir, &layout.data_files, &layout.output_dir);
    if let Some(notes) = notes {
        input = input.with_notes(notes);
    }
    populate(&profile.instruction_template, &input).context("Failed to build instruction")
}

fn redacted_json(mcp_config: &McpConfig, config: &RunnerConfig) -> Result<String> {
    let secrets = [
        config.credentials.supabase_access_token.expose_secret().to_string(),
        config.credentials.kumo_api_key.expose_secret().to_string(),
    ];
    serde_json::to_string_pretty(&mcp_config.redacted(&secrets))
        .context("Failed to serialize tool providers")
}
