//! Run command - one invocation over a file or stdin
//!
//! Every non-empty input line is one record. The source name selects the
//! configured source: it defaults to the input file stem, or `stdin`.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use sluice_config::Config;
use sluice_pipeline::Handler;
use sluice_protocol::{ReaderSource, RecordSource};

#[cfg(test)]
#[path = "run_test.rs"]
mod tests;

/// Run command arguments
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Newline-delimited input (reads stdin when omitted)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Source name matched against each source's `source_regex`
    #[arg(short = 'n', long)]
    pub source_name: Option<String>,
}

/// Run the run command
pub async fn run(args: RunArgs, config: &Config) -> Result<()> {
    let handler = Handler::from_config(config).context("failed to build pipeline")?;

    let source_name = args
        .source_name
        .clone()
        .unwrap_or_else(|| default_source_name(args.input.as_deref()));

    let source: Box<dyn RecordSource> = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open input {}", path.display()))?;
            Box::new(ReaderSource::new(BufReader::new(file)))
        }
        None => Box::new(ReaderSource::new(BufReader::new(std::io::stdin()))),
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        source = %source_name,
        transport = handler.transport().name(),
        "sluice starting"
    );

    let report = handler.process(&source_name, source).await?;
    if let Some(error) = &report.error {
        warn!(error = %error, "invocation failed, error suppressed by fail_on_exception = false");
    }

    Ok(())
}

/// File stem of the input, or `stdin`
fn default_source_name(input: Option<&Path>) -> String {
    input
        .and_then(|p| p.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stdin".to_string())
}
