//! Text-completion oracle client.
//!
//! The oracle is an external generative-text service used both as a soft
//! classifier (source selection) and as a narrative generator (insights,
//! chat replies). It is non-deterministic and untrusted: callers must
//! strict-parse anything they want to treat as structured data.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::OracleConfig;

/// Transport-level failures of a completion call. Shape problems in the
/// reply text are the caller's concern, not the client's.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("cannot reach completion endpoint at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("completion request timed out after {0}s")]
    Timeout(u64),

    #[error("completion endpoint returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("completion reply malformed: {0}")]
    MalformedReply(String),
}

/// Interface to the text-completion oracle. The pipeline only ever sees
/// this trait, so tests can substitute deterministic oracles.
#[async_trait]
pub trait CompletionOracle: Send + Sync {
    /// Submit one prompt and return the raw reply text. No retries.
    async fn complete(&self, prompt: &str) -> Result<String, OracleError>;
}

/// Ollama-style generate API request.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Ollama-style generate API response.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// HTTP client for an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaOracle {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout_seconds: u64,
}

impl OllamaOracle {
    pub fn new(config: &OracleConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.url.clone(),
            model: config.model.clone(),
            timeout_seconds: config.timeout_seconds,
        }
    }
}

#[async_trait]
impl CompletionOracle for OllamaOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        debug!("Sending completion request ({} chars)", prompt.len());

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout(self.timeout_seconds)
                } else {
                    OracleError::Unreachable {
                        url: self.base_url.clone(),
                        reason: e.to_string(),
                    }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::HttpStatus { status, body });
        }

        let reply: GenerateResponse = response
            .json()
            .await
            .map_err(|e| OracleError::MalformedReply(e.to_string()))?;

        Ok(reply.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_wire_shape() {
        let request = GenerateRequest {
            model: "mistral",
            prompt: "hello",
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "mistral");
        assert_eq!(json["prompt"], "hello");
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn test_generate_response_parses_response_field() {
        let reply: GenerateResponse =
            serde_json::from_str(r#"{"response": " text ", "done": true}"#).unwrap();
        assert_eq!(reply.response, " text ");
    }
}
