//! Fan-out aggregator: issues provider calls concurrently and collects
//! every outcome before returning.
//!
//! Each call settles independently; a failing call is captured as a
//! failure outcome and never aborts its siblings. Output order always
//! matches input order regardless of completion order. Retry policy, if
//! any, belongs to the caller, never to this layer.

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ProviderConfig;

/// One resolved provider invocation: where to post, and what lookup fields
/// to send.
#[derive(Debug, Clone)]
pub struct ProviderCall {
    pub endpoint: String,
    pub fields: Map<String, Value>,
}

impl ProviderCall {
    pub fn new(endpoint: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            endpoint: endpoint.into(),
            fields,
        }
    }

    /// Every provider call carries the report id it belongs to.
    pub fn inject_report_id(&mut self, report_id: &str) {
        self.fields
            .insert("report_id".to_string(), Value::String(report_id.to_string()));
    }
}

/// Why a single provider call failed. `connection_failure` distinguishes
/// "endpoint unreachable" (connect error, timeout) from semantic errors
/// (non-2xx status, malformed payload), since callers may treat
/// unreachability as transient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFailure {
    pub reason: String,
    pub connection_failure: bool,
}

/// Settled result of one provider call, index-aligned with the input batch.
#[derive(Debug, Clone)]
pub struct FanOutOutcome {
    pub endpoint: String,
    pub result: Result<Value, CallFailure>,
}

impl FanOutOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn payload(&self) -> Option<&Value> {
        self.result.as_ref().ok()
    }
}

/// Transport used to execute a single provider call. Behind a trait so
/// tests can drive the aggregator without network I/O.
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    async fn call(&self, call: &ProviderCall) -> Result<Value, CallFailure>;
}

/// Production transport: JSON POST to the call's endpoint with a per-call
/// timeout.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &ProviderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }
}

#[async_trait]
impl ProviderTransport for HttpTransport {
    async fn call(&self, call: &ProviderCall) -> Result<Value, CallFailure> {
        let response = self
            .client
            .post(&call.endpoint)
            .json(&call.fields)
            .send()
            .await
            .map_err(|e| CallFailure {
                reason: e.to_string(),
                connection_failure: e.is_connect() || e.is_timeout(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CallFailure {
                reason: format!("HTTP {}: {}", status, body),
                connection_failure: false,
            });
        }

        response.json().await.map_err(|e| CallFailure {
            reason: format!("malformed payload: {}", e),
            connection_failure: false,
        })
    }
}

/// Issues a batch of provider calls concurrently and waits for all of them
/// to settle.
pub struct FanOutAggregator {
    transport: Arc<dyn ProviderTransport>,
}

impl FanOutAggregator {
    pub fn new(transport: Arc<dyn ProviderTransport>) -> Self {
        Self { transport }
    }

    /// Execute every call concurrently. The returned vector has the same
    /// length and index correspondence as the input, whatever order the
    /// calls completed in.
    pub async fn execute(&self, calls: &[ProviderCall]) -> Vec<FanOutOutcome> {
        debug!("Fanning out {} provider calls", calls.len());

        let futures = calls.iter().map(|call| {
            let transport = Arc::clone(&self.transport);
            async move {
                let result = transport.call(call).await;
                if let Err(ref failure) = result {
                    warn!(
                        "Provider call to {} failed ({}connection): {}",
                        call.endpoint,
                        if failure.connection_failure { "" } else { "non-" },
                        failure.reason
                    );
                }
                FanOutOutcome {
                    endpoint: call.endpoint.clone(),
                    result,
                }
            }
        });

        join_all(futures).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Transport that answers from a scripted table, with optional per-call
    /// delays so tests can invert completion order.
    struct ScriptedTransport {
        delays_ms: Vec<u64>,
    }

    #[async_trait]
    impl ProviderTransport for ScriptedTransport {
        async fn call(&self, call: &ProviderCall) -> Result<Value, CallFailure> {
            // Endpoint suffix "/n" picks the script row.
            let index: usize = call
                .endpoint
                .rsplit('/')
                .next()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);

            if let Some(&delay) = self.delays_ms.get(index) {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            if call.fields.contains_key("fail") {
                return Err(CallFailure {
                    reason: "connection refused".into(),
                    connection_failure: true,
                });
            }

            Ok(json!({ "index": index }))
        }
    }

    fn call(index: usize) -> ProviderCall {
        ProviderCall::new(format!("http://test/{}", index), Map::new())
    }

    fn failing_call(index: usize) -> ProviderCall {
        let mut fields = Map::new();
        fields.insert("fail".into(), Value::Bool(true));
        ProviderCall::new(format!("http://test/{}", index), fields)
    }

    #[tokio::test]
    async fn test_output_order_matches_input_under_reordered_completion() {
        // First call finishes last, last call finishes first.
        let transport = ScriptedTransport {
            delays_ms: vec![30, 20, 10, 0],
        };
        let aggregator = FanOutAggregator::new(Arc::new(transport));
        let calls: Vec<ProviderCall> = (0..4).map(call).collect();

        let outcomes = aggregator.execute(&calls).await;

        assert_eq!(outcomes.len(), calls.len());
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.endpoint, calls[i].endpoint);
            assert_eq!(outcome.payload().unwrap()["index"], i as u64);
        }
    }

    #[tokio::test]
    async fn test_single_failure_never_aborts_siblings() {
        let transport = ScriptedTransport { delays_ms: vec![] };
        let aggregator = FanOutAggregator::new(Arc::new(transport));
        let calls = vec![call(0), failing_call(1), call(2)];

        let outcomes = aggregator.execute(&calls).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_success());
        assert!(!outcomes[1].is_success());
        assert!(outcomes[2].is_success());

        let failure = outcomes[1].result.as_ref().unwrap_err();
        assert!(failure.connection_failure);
    }

    #[tokio::test]
    async fn test_empty_batch_yields_empty_outcomes() {
        let transport = ScriptedTransport { delays_ms: vec![] };
        let aggregator = FanOutAggregator::new(Arc::new(transport));

        let outcomes = aggregator.execute(&[]).await;
        assert!(outcomes.is_empty());
    }

    #[test]
    fn test_inject_report_id() {
        let mut call = ProviderCall::new("http://test/0", Map::new());
        call.inject_report_id("REP-1-abcdef");
        assert_eq!(call.fields["report_id"], "REP-1-abcdef");
    }
}
