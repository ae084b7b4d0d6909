//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.riskweave.toml` files. One explicit configuration structure is passed
//! into each component at construction; components never read the
//! environment themselves.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Text-completion oracle settings.
    #[serde(default)]
    pub oracle: OracleConfig,

    /// External risk-scorer settings.
    #[serde(default)]
    pub scorer: ScorerConfig,

    /// Bureau provider settings.
    #[serde(default)]
    pub providers: ProviderConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the service listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            verbose: false,
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

/// Text-completion oracle settings (classifier and narrative generation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Base URL of the Ollama-compatible endpoint.
    #[serde(default = "default_oracle_url")]
    pub url: String,

    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// Request timeout in seconds.
    #[serde(default = "default_oracle_timeout")]
    pub timeout_seconds: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            url: default_oracle_url(),
            model: default_model(),
            timeout_seconds: default_oracle_timeout(),
        }
    }
}

fn default_oracle_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "mistral".to_string()
}

fn default_oracle_timeout() -> u64 {
    120
}

/// External risk-scorer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerConfig {
    /// Full URL of the scoring endpoint.
    #[serde(default = "default_scorer_url")]
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_scorer_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            url: default_scorer_url(),
            timeout_seconds: default_scorer_timeout(),
        }
    }
}

fn default_scorer_url() -> String {
    "http://127.0.0.1:5000/data_for_ml".to_string()
}

fn default_scorer_timeout() -> u64 {
    30
}

/// Bureau provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL the registry's endpoint paths are joined to.
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,

    /// Per-call timeout in seconds for fan-out requests.
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            timeout_seconds: default_provider_timeout(),
        }
    }
}

fn default_provider_base_url() -> String {
    "http://127.0.0.1:4000".to_string()
}

fn default_provider_timeout() -> u64 {
    10
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but
    /// can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".riskweave.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings; optional
    /// arguments only override when explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        // Oracle settings - always override since they have defaults in CLI
        self.oracle.model = args.model.clone();
        self.oracle.url = args.oracle_url.clone();

        if let Some(timeout) = args.oracle_timeout {
            self.oracle.timeout_seconds = timeout;
        }

        // Optional settings - only override if provided
        if let Some(ref bind) = args.bind {
            self.server.bind_addr = bind.clone();
        }
        if let Some(ref url) = args.scorer_url {
            self.scorer.url = url.clone();
        }
        if let Some(ref url) = args.provider_base_url {
            self.providers.base_url = url.clone();
        }

        // Flags always override
        if args.verbose {
            self.server.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.oracle.model, "mistral");
        assert_eq!(config.oracle.url, "http://localhost:11434");
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.providers.timeout_seconds, 10);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[server]
bind_addr = "0.0.0.0:9090"
verbose = true

[oracle]
model = "llama3.2:latest"
timeout_seconds = 60

[providers]
base_url = "http://bureaus.internal:4000"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:9090");
        assert!(config.server.verbose);
        assert_eq!(config.oracle.model, "llama3.2:latest");
        assert_eq!(config.oracle.timeout_seconds, 60);
        assert_eq!(config.providers.base_url, "http://bureaus.internal:4000");
        // Unspecified sections keep their defaults.
        assert_eq!(config.scorer.url, "http://127.0.0.1:5000/data_for_ml");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[oracle]"));
        assert!(toml_str.contains("[scorer]"));
        assert!(toml_str.contains("[providers]"));
    }
}
