//! Sluice - per-invocation event pipeline
//!
//! # Usage
//!
//! ```bash
//! # One invocation over stdin
//! cat app.log | sluice run --config sluice.toml --source-name app
//!
//! # One invocation over a file (source name defaults to the file stem)
//! sluice run --config sluice.toml --input app-2024.log
//!
//! # Build every source and the transport without running anything
//! sluice validate --config sluice.toml
//! ```

mod cmd;

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sluice_config::{Config, LogConfig, LogFormat, LogOutput};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

/// Sluice - per-invocation event pipeline
#[derive(Parser, Debug)]
#[command(name = "sluice")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one invocation over newline-delimited records
    Run(cmd::run::RunArgs),

    /// Build every configured component and report
    Validate(cmd::validate::ValidateArgs),
}

impl Command {
    fn config_path(&self) -> &Path {
        match self {
            Self::Run(args) => &args.config,
            Self::Validate(args) => &args.config,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli.command.config_path();
    let config = Config::from_file(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;

    init_logging(cli.log_level.as_deref(), &config.log)?;

    match cli.command {
        Command::Run(args) => cmd::run::run(args, &config).await,
        Command::Validate(_) => cmd::validate::run(&config),
    }
}

/// Initialize the tracing subscriber; `--log-level` wins over `[log] level`
fn init_logging(cli_level: Option<&str>, log: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(log.filter(cli_level))
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt_layer(log))
        .with(filter)
        .init();

    Ok(())
}

fn fmt_layer(log: &LogConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = fmt::layer().with_target(true).with_thread_ids(false);
    match (log.format, log.output) {
        (LogFormat::Json, LogOutput::Stdout) => layer.json().with_writer(std::io::stdout).boxed(),
        (LogFormat::Json, LogOutput::Stderr) => layer.json().with_writer(std::io::stderr).boxed(),
        (LogFormat::Console, LogOutput::Stdout) => layer.with_writer(std::io::stdout).boxed(),
        (LogFormat::Console, LogOutput::Stderr) => layer.with_writer(std::io::stderr).boxed(),
    }
}
