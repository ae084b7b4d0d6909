//! Source selector: decides which providers are relevant to a context.
//!
//! The free-text context is embedded into a classification prompt together
//! with the full provider catalog and an override rule (risk analysis or
//! lending contexts select everything). The oracle's reply is strict-parsed;
//! an unreachable oracle or a reply that is not the expected JSON shape is a
//! hard `SelectionError`, never silently substituted with an empty or full
//! selection.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::SelectionError;
use crate::oracle::{CompletionOracle, OracleError};
use crate::registry::ProviderRegistry;

/// The subset of providers relevant to one report-creation request. Every
/// id is guaranteed to exist in the registry; an empty set is a valid
/// "no relevant source" result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionResult {
    pub provider_ids: BTreeSet<u32>,
}

/// Expected reply shape from the classifier.
#[derive(Debug, Deserialize)]
struct ClassifierReply {
    provider_ids: Vec<u32>,
}

pub struct SourceSelector {
    oracle: Arc<dyn CompletionOracle>,
    registry: Arc<ProviderRegistry>,
}

impl SourceSelector {
    pub fn new(oracle: Arc<dyn CompletionOracle>, registry: Arc<ProviderRegistry>) -> Self {
        Self { oracle, registry }
    }

    /// Classify the context against the provider catalog. One oracle call,
    /// no retries.
    pub async fn select(&self, context: &Value) -> Result<SelectionResult, SelectionError> {
        let prompt = self.build_prompt(context);

        let reply = self.oracle.complete(&prompt).await.map_err(|e| match e {
            OracleError::MalformedReply(reason) => SelectionError::MalformedReply(reason),
            other => SelectionError::OracleUnreachable(other.to_string()),
        })?;

        debug!("Classifier reply: {}", reply);

        let ids = parse_reply(&reply)?;

        // Ids the oracle hallucinated outside the catalog cannot be turned
        // into provider calls; filter them rather than failing the request.
        let known = self.registry.all_ids();
        let mut provider_ids = BTreeSet::new();
        for id in ids {
            if known.contains(&id) {
                provider_ids.insert(id);
            } else {
                warn!("Classifier returned unknown provider id {}, dropping", id);
            }
        }

        Ok(SelectionResult { provider_ids })
    }

    fn build_prompt(&self, context: &Value) -> String {
        format!(
            r#"You are an intelligent data-source selector that strictly returns only provider ID(s) based on the provided context.
- You first analyze the given context and determine the most relevant providers to be called.
- To be safe, you also return provider IDs that are slightly less relevant to the context.
- Special Condition:
  - If the context involves risk analysis, credit risk assessment, or loan granting, return ALL provider IDs.

Context & Matching Logic:
- You have access to a list of providers, each with a specific "capability".
- Select providers whose "capability" is relevant to the given context.
- If multiple providers match, return all applicable "provider_id" values in a JSON array.
- Do NOT return any additional information, explanations, or text.
- If no provider matches, return an empty JSON array: {{ "provider_ids": [] }}.

Given Context (Match Relevant Providers):
{context}

List of Providers:
{catalog}

Rules:
1. Select only those providers where "capability" is relevant to the context.
2. If the context involves risk analysis or loan granting, return ALL provider IDs.
3. If no provider matches, return: {{ "provider_ids": [] }}.

Output Format (Strict JSON Response):
{{ "provider_ids": [provider_id_1, provider_id_2, ...] }}
"#,
            context = context,
            catalog = self.registry.capability_catalog(),
        )
    }
}

/// Strict-parse the classifier reply. The oracle sometimes wraps its JSON
/// in markdown fences; extracting the object is allowed, but the object
/// itself must match the schema exactly.
fn parse_reply(reply: &str) -> Result<Vec<u32>, SelectionError> {
    let trimmed = reply.trim();
    let candidate = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);

    let parsed: ClassifierReply = serde_json::from_str(candidate)
        .map_err(|e| SelectionError::MalformedReply(format!("{}: {}", e, candidate)))?;

    Ok(parsed.provider_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Deterministic stand-in for the classifier oracle. Honors the
    /// override rule: contexts mentioning loans or risk select everything.
    struct RuleOracle;

    #[async_trait]
    impl CompletionOracle for RuleOracle {
        async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
            // Only the embedded context decides; the surrounding prompt
            // text always mentions loans and risk.
            let context = prompt
                .split("Given Context (Match Relevant Providers):")
                .nth(1)
                .and_then(|rest| rest.split("List of Providers:").next())
                .unwrap_or("")
                .to_lowercase();
            if context.contains("loan") || context.contains("risk") {
                let all: Vec<String> = (1..=15).map(|i| i.to_string()).collect();
                Ok(format!(r#"{{ "provider_ids": [{}] }}"#, all.join(", ")))
            } else {
                Ok(r#"{ "provider_ids": [] }"#.to_string())
            }
        }
    }

    /// Oracle that replies with a fixed string regardless of prompt.
    struct CannedOracle(String);

    #[async_trait]
    impl CompletionOracle for CannedOracle {
        async fn complete(&self, _prompt: &str) -> Result<String, OracleError> {
            Ok(self.0.clone())
        }
    }

    /// Oracle that is never reachable.
    struct DownOracle;

    #[async_trait]
    impl CompletionOracle for DownOracle {
        async fn complete(&self, _prompt: &str) -> Result<String, OracleError> {
            Err(OracleError::Unreachable {
                url: "http://localhost:11434".into(),
                reason: "connection refused".into(),
            })
        }
    }

    fn selector(oracle: impl CompletionOracle + 'static) -> SourceSelector {
        SourceSelector::new(Arc::new(oracle), Arc::new(ProviderRegistry::standard()))
    }

    #[tokio::test]
    async fn test_loan_context_selects_full_catalog() {
        let selector = selector(RuleOracle);
        let context = serde_json::json!({ "purpose": "loan approval" });

        let result = selector.select(&context).await.unwrap();
        assert_eq!(result.provider_ids, (1..=15).collect());
    }

    #[tokio::test]
    async fn test_unrelated_context_selects_nothing() {
        let selector = selector(RuleOracle);
        let context = serde_json::json!({ "purpose": "change of address" });

        let result = selector.select(&context).await.unwrap();
        assert!(result.provider_ids.is_empty());
    }

    #[tokio::test]
    async fn test_non_json_reply_is_a_hard_error() {
        let selector = selector(CannedOracle("not json".into()));
        let err = selector
            .select(&serde_json::json!({ "purpose": "loan approval" }))
            .await
            .unwrap_err();
        assert!(matches!(err, SelectionError::MalformedReply(_)));
    }

    #[tokio::test]
    async fn test_wrong_shape_reply_is_a_hard_error() {
        // Valid JSON, wrong schema.
        let selector = selector(CannedOracle(r#"{ "ids": [1, 2] }"#.into()));
        let err = selector
            .select(&serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, SelectionError::MalformedReply(_)));
    }

    #[tokio::test]
    async fn test_unreachable_oracle_is_a_hard_error() {
        let selector = selector(DownOracle);
        let err = selector
            .select(&serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, SelectionError::OracleUnreachable(_)));
    }

    #[tokio::test]
    async fn test_unknown_ids_are_filtered() {
        let selector = selector(CannedOracle(r#"{ "provider_ids": [1, 99, 7, 400] }"#.into()));
        let result = selector.select(&serde_json::json!({})).await.unwrap();
        assert_eq!(result.provider_ids, [1, 7].into_iter().collect());
    }

    #[tokio::test]
    async fn test_fenced_json_reply_is_accepted() {
        let selector = selector(CannedOracle(
            "```json\n{ \"provider_ids\": [3] }\n```".into(),
        ));
        let result = selector.select(&serde_json::json!({})).await.unwrap();
        assert_eq!(result.provider_ids, [3].into_iter().collect());
    }
}
