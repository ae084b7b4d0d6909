//! Riskweave - LLM-routed credit-risk report orchestration service
//!
//! An HTTP service that assembles credit-risk reports: a text-completion
//! oracle routes each request context to the relevant bureau providers,
//! the selected providers are queried concurrently with per-call failure
//! isolation, results are normalized into one canonical record, and an
//! external scorer plus narrative generation turn the record into an
//! explainable report with a follow-up chat session.
//!
//! Exit codes:
//!   0 - Clean shutdown
//!   1 - Runtime error (bind failure, config error, etc.)

mod cli;
mod config;
mod error;
mod fanout;
mod insights;
mod models;
mod normalizer;
mod oracle;
mod pipeline;
mod registry;
mod scoring;
mod selector;
mod server;
mod session;

use anyhow::{Context, Result};
use cli::Args;
use config::Config;
use pipeline::Pipeline;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Riskweave v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Run the service
    if let Err(e) = run_service(args).await {
        error!("Service failed: {}", e);
        eprintln!("\nError: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .riskweave.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".riskweave.toml");

    if path.exists() {
        eprintln!(".riskweave.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .riskweave.toml")?;

    println!("Created .riskweave.toml with default settings.");
    println!("Edit it to customize the oracle, scorer, and provider endpoints.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Wire the pipeline from configuration and serve until teardown.
async fn run_service(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.server.bind_addr))?;

    info!("Oracle: {} (model {})", config.oracle.url, config.oracle.model);
    info!("Scorer: {}", config.scorer.url);
    info!("Providers: {}", config.providers.base_url);

    let pipeline = Arc::new(Pipeline::from_config(&config));

    server::serve(addr, pipeline).await
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .riskweave.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
