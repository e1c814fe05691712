//! Tracing setup for the server binary.
//!
//! Every event is emitted under one of the `sqlshelf::*` targets in
//! [`TARGETS`]. Verbosity picks a baseline for them, `--log name=level`
//! adjusts single targets, and a set `RUST_LOG` replaces both.

use anyhow::{bail, Result};
use clap::ValueEnum;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Short names of the targets the workspace logs under.
pub const TARGETS: [&str; 6] = ["startup", "api", "store", "session", "catalog", "query"];

/// Request spans from `TraceLayer`.
const HTTP_TARGET: &str = "tower_http";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Baseline level chosen by `-q` / `-v` / `-vv`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Debug,
    Trace,
}

impl Verbosity {
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (false, 0) => Verbosity::Normal,
            (false, 1) => Verbosity::Debug,
            (false, _) => Verbosity::Trace,
        }
    }

    /// Storage and session events are worth seeing in normal operation;
    /// per-statement catalog and query chatter is not.
    fn level_for(self, target: &str) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal if matches!(target, "catalog" | "query") => "warn",
            Verbosity::Normal => "info",
            Verbosity::Debug => "debug",
            Verbosity::Trace => "trace",
        }
    }

    fn http_level(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Debug => "debug",
            Verbosity::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub verbosity: Verbosity,
    /// Fully qualified `target=level` directives from `--log`.
    pub overrides: Vec<String>,
    pub format: LogFormat,
}

impl LogConfig {
    /// Build from CLI flags. Each `--log` value holds comma-separated
    /// `name=level` pairs where `name` is one of [`TARGETS`] or `tower_http`.
    pub fn from_cli(verbosity: Verbosity, log: &[String], format: LogFormat) -> Result<Self> {
        let mut overrides = Vec::new();
        for pair in log.iter().flat_map(|value| value.split(',')) {
            overrides.push(parse_override(pair.trim())?);
        }
        Ok(Self {
            verbosity,
            overrides,
            format,
        })
    }

    /// Filter directives in application order; later ones win.
    pub fn directives(&self) -> Vec<String> {
        let mut directives: Vec<String> = TARGETS
            .iter()
            .map(|target| format!("sqlshelf::{target}={}", self.verbosity.level_for(target)))
            .collect();
        directives.push(format!("{HTTP_TARGET}={}", self.verbosity.http_level()));
        directives.extend(self.overrides.iter().cloned());
        directives
    }

    fn filter(&self) -> Result<EnvFilter> {
        if let Ok(from_env) = EnvFilter::try_from_default_env() {
            return Ok(from_env);
        }
        Ok(EnvFilter::try_new(self.directives().join(","))?)
    }
}

fn parse_override(pair: &str) -> Result<String> {
    let Some((name, level)) = pair.split_once('=') else {
        bail!("log override '{pair}' is not of the form name=level");
    };
    let name = name.trim();
    let level: Level = level
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown log level in '{pair}'"))?;

    let target = match name.strip_prefix("sqlshelf::").unwrap_or(name) {
        short if TARGETS.contains(&short) => format!("sqlshelf::{short}"),
        HTTP_TARGET => HTTP_TARGET.to_string(),
        _ => bail!(
            "unknown log target '{name}', expected one of {} or {HTTP_TARGET}",
            TARGETS.join(", ")
        ),
    };
    Ok(format!("{target}={}", level.as_str().to_lowercase()))
}

/// Install the global subscriber.
pub fn init(config: &LogConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(config.filter()?);
    match config.format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .try_init()?,
    }
    Ok(())
}
