//! sqlshelf server - per-user SQLite storage with read-only queries over HTTP.

use anyhow::Result;
use axum::Router;
use clap::{ArgAction, Parser};
use sqlshelf_server::{config, logging, routes, state};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use config::Config;
use logging::{LogConfig, LogFormat, Verbosity};
use state::AppState;

/// sqlshelf server - upload SQLite databases and query them read-only.
#[derive(Parser, Debug)]
#[command(name = "sqlshelf-server")]
#[command(about = "HTTP server for per-user SQLite databases")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override port from config
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the directory holding user databases
    #[arg(long, value_name = "DIR")]
    storage_root: Option<PathBuf>,

    /// More log output: -v for debug, -vv for trace
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Per-target level, e.g. "query=debug" or "store=trace,api=warn"
    #[arg(long = "log", value_name = "TARGET=LEVEL")]
    log_overrides: Vec<String>,

    /// Log output format
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::from_cli(
        Verbosity::from_flags(cli.verbose, cli.quiet),
        &cli.log_overrides,
        cli.log_format,
    )?;
    logging::init(&log_config)?;

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // CLI overrides
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(storage_root) = cli.storage_root {
        config.storage_root = storage_root;
    }

    tracing::info!(
        target: "sqlshelf::startup",
        "Loaded configuration (port: {}, storage: {:?})", config.port, config.storage_root
    );

    let state = Arc::new(AppState::new(config.clone())?);
    tracing::info!(target: "sqlshelf::startup", "Initialized application state");

    let app = Router::new()
        .nest("/api", routes::api())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!(target: "sqlshelf::startup", "Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
