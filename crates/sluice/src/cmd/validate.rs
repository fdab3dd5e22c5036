//! Validate command - build every component without running

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use sluice_config::Config;
use sluice_pipeline::Handler;

/// Validate command arguments
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: PathBuf,
}

/// Run the validate command
pub fn run(config: &Config) -> Result<()> {
    let handler = Handler::from_config(config).context("configuration is invalid")?;

    println!("configuration OK");
    for name in handler.route_names() {
        let source = config.source(name);
        let operations = source.map_or(0, |s| s.operations.len());
        println!("  source {name}: {operations} operation(s)");
    }
    println!(
        "  transport {} ({} thread(s))",
        handler.transport().name(),
        handler.transport().max_threads()
    );

    Ok(())
}
