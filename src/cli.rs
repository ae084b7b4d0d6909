//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Riskweave - LLM-routed credit-risk report orchestration service
///
/// Assembles credit-risk reports by classifying a request context against a
/// catalog of bureau providers, fanning out to the selected providers,
/// normalizing the results, and folding an external risk score into a
/// narrative with a report-scoped follow-up chat.
///
/// Examples:
///   riskweave
///   riskweave --bind 0.0.0.0:8080 --model mistral
///   riskweave --oracle-url http://gpu-box:11434 --scorer-url http://ml:5000/data_for_ml
///   riskweave --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Address to listen on
    ///
    /// Defaults to the config file value (127.0.0.1:8080 when unset).
    #[arg(short, long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Oracle model to use for classification and narrative
    ///
    /// Can also be set via RISKWEAVE_MODEL env var or .riskweave.toml config.
    #[arg(short, long, default_value = "mistral", env = "RISKWEAVE_MODEL")]
    pub model: String,

    /// Text-completion oracle endpoint URL
    #[arg(long, default_value = "http://localhost:11434", env = "OLLAMA_URL")]
    pub oracle_url: String,

    /// Oracle request timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub oracle_timeout: Option<u64>,

    /// Risk-scorer endpoint URL
    #[arg(long, value_name = "URL", env = "SCORER_URL")]
    pub scorer_url: Option<String>,

    /// Base URL for bureau provider endpoints
    #[arg(long, value_name = "URL", env = "PROVIDER_BASE_URL")]
    pub provider_base_url: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .riskweave.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .riskweave.toml and exit
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate argument combinations.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("--verbose and --quiet are mutually exclusive".to_string());
        }

        if let Some(ref bind) = self.bind {
            if bind.parse::<std::net::SocketAddr>().is_err() {
                return Err(format!("invalid bind address: {}", bind));
            }
        }

        Ok(())
    }

    /// Tracing level implied by the verbosity flags.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
