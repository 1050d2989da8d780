use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use retain::contexts::PermissionMode;

mod cli;

#[derive(Parser)]
#[command(name = "retain")]
#[command(about = "Drives an MCP-enabled agent through the policy-retention workflow", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Enable verbose debug output")]
    verbose: bool,

    #[arg(long, global = true, help = "Show what would be sent without starting the agent")]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the retention workflow and stream the agent's progress")]
    Run {
        #[arg(long, help = "Maximum conversational turns (unlimited when omitted)")]
        max_turns: Option<u32>,

        #[arg(long, help = "Stop the run after this many seconds")]
        timeout_secs: Option<u64>,

        #[arg(long, help = "Write a JSON summary of the run to this path")]
        summary: Option<PathBuf>,

        #[arg(long, help = "Agent profile YAML (defaults to agents/retention.yml)")]
        agent: Option<PathBuf>,

        #[arg(long, help = "Tool provider YAML (defaults to agents/tool_providers.yml)")]
        providers: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = PermissionMode::BypassPermissions)]
        permission_mode: PermissionMode,

        #[arg(long, help = "Extra guidance appended to the instruction")]
        notes: Option<String>,
    },

    #[command(about = "Print the instruction that would be sent to the agent")]
    Prompt {
        #[arg(long, help = "Agent profile YAML (defaults to agents/retention.yml)")]
        agent: Option<PathBuf>,

        #[arg(long, help = "Extra guidance appended to the instruction")]
        notes: Option<String>,
    },

    #[command(about = "Print the tool provider configuration with secrets masked")]
    Providers {
        #[arg(long, help = "Tool provider YAML (defaults to agents/tool_providers.yml)")]
        providers: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli::Config {
        verbose: cli.verbose,
        dry_run: cli.dry_run,
    };

    match cli.command {
        Commands::Run {
            max_turns,
            timeout_secs,
            summary,
            agent,
            providers,
            permission_mode,
            notes,
        } => {
            let options = cli::RunOptions {
                max_turns,
                timeout_secs,
                summary,
                agent,
                providers,
                permission_mode,
                notes,
            };
            cli::run(options, &config).await?;
        }
        Commands::Prompt { agent, notes } => {
            cli::show_prompt(agent, notes)?;
        }
        Commands::Providers { providers } => {
            cli::show_providers(providers)?;
        }
    }

    Ok(())
}
