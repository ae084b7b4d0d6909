//! External risk-scorer client.
//!
//! The numeric scoring function is a black-box HTTP service: it takes the
//! canonical record and returns an aggregated risk score plus the profile
//! data it scored. Its failures are hard failures for the aggregation
//! request, though the report itself survives with no score attached.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::ScorerConfig;
use crate::error::ScoringServiceError;
use crate::models::CanonicalRecord;

/// Request body: `{"data": <canonical record>}`.
#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    data: &'a CanonicalRecord,
}

/// Reply from the scorer: the aggregated score and the (possibly enriched)
/// profile data it scored, which feeds the narrative prompt.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreReply {
    pub risk_score: f64,
    #[serde(default)]
    pub data: Value,
}

/// Interface to the scoring service, trait-shaped so the pipeline can be
/// tested without a live model server.
#[async_trait]
pub trait ScoreService: Send + Sync {
    async fn score(&self, record: &CanonicalRecord) -> Result<ScoreReply, ScoringServiceError>;
}

/// Production scorer client.
pub struct HttpScorer {
    client: reqwest::Client,
    url: String,
}

impl HttpScorer {
    pub fn new(config: &ScorerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            url: config.url.clone(),
        }
    }
}

#[async_trait]
impl ScoreService for HttpScorer {
    async fn score(&self, record: &CanonicalRecord) -> Result<ScoreReply, ScoringServiceError> {
        let response = self
            .client
            .post(&self.url)
            .json(&ScoreRequest { data: record })
            .send()
            .await
            .map_err(|e| ScoringServiceError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ScoringServiceError::HttpStatus { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| ScoringServiceError::MalformedReply(e.to_string()))
    }
}
