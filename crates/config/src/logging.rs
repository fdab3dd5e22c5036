//! `[log]` section for the sluice binary's own diagnostics
//!
//! The `stdout` transport writes buffers to stdout, so logs default to
//! stderr.

use std::fmt;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Console,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    #[default]
    Stderr,
}

/// ```toml
/// [log]
/// level = "warn"
/// format = "json"
/// directives = "sluice_transport=debug,sluice_pipeline::send=trace"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,

    /// Per-target `EnvFilter` directives added after the base level
    pub directives: Option<String>,
}

impl LogConfig {
    /// `EnvFilter` string: the CLI level if given, else `level`, then any
    /// directives
    pub fn filter(&self, cli_level: Option<&str>) -> String {
        let base = cli_level.map_or_else(|| self.level.to_string(), str::to_string);
        match self.directives.as_deref().map(str::trim) {
            Some(extra) if !extra.is_empty() => format!("{base},{extra}"),
            _ => base,
        }
    }
}
