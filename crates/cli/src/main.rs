//! Concierge CLI
//!
//! Runs the query router as an HTTP service, answers one-off queries and
//! manages the knowledge bases and user settings.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{AskCommand, ConfigCommand, KnowledgeCommand, ServeCommand};
use concierge_core::{config::AppConfig, logging};
use std::path::PathBuf;

/// Concierge - routes questions to knowledge-base, web search or chat agents
#[derive(Parser, Debug)]
#[command(name = "concierge")]
#[command(about = "Routes questions to knowledge-base, web search or chat agents", long_about = None)]
#[command(version)]
struct Cli {
    /// Data directory for settings and knowledge bases
    #[arg(short, long, global = true, env = "CONCIERGE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "CONCIERGE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (ollama, openai, dashscope, mock)
    #[arg(short, long, global = true, env = "CONCIERGE_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "CONCIERGE_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve(ServeCommand),

    /// Route a single query and print the answer
    Ask(AskCommand),

    /// Knowledge base management
    Knowledge(KnowledgeCommand),

    /// Show or reset the user settings
    Config(ConfigCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Serve(_) => "serve",
            Self::Ask(_) => "ask",
            Self::Knowledge(_) => "knowledge",
            Self::Config(_) => "config",
        }
    }
}

/// Defaults, then the YAML file and environment, then an explicit
/// `--config`/`--data-dir` file, then flags.
fn resolve_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load().context("Failed to load configuration")?;

    let extra_file = match (&cli.config, &cli.data_dir) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(dir)) => Some(dir.join("concierge.yaml")).filter(|p| p.exists()),
        (None, None) => None,
    };
    if let Some(path) = extra_file {
        // load() has already merged the file when it exists at this path.
        let already_merged = path == config.config_path() && path.exists();
        if !already_merged {
            config = config
                .merge_yaml(&path)
                .with_context(|| format!("Failed to read config file {:?}", path))?;
        }
    }

    Ok(config.with_overrides(
        cli.data_dir.clone(),
        cli.config.clone(),
        cli.provider.clone(),
        cli.model.clone(),
        cli.log_level.clone(),
        cli.verbose,
        cli.no_color,
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Concierge CLI starting");
    tracing::debug!("Data dir: {:?}", config.data_dir);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.validate()?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Serve(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Knowledge(cmd) => cmd.execute(&config).await,
        Commands::Config(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {:#}", e),
    }

    result
}
