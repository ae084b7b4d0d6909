//! Orchestration pipeline for the three report flows.
//!
//! Control flow: context → source selection → provider call plan →
//! fan-out → normalization → external scorer → narrative → report session.
//! Selection and scoring failures are hard failures for their request;
//! per-provider failures and narrative failures degrade instead.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::error::RiskweaveError;
use crate::fanout::{FanOutAggregator, HttpTransport, ProviderCall, ProviderTransport};
use crate::insights::InsightGenerator;
use crate::models::{CanonicalRecord, Speaker};
use crate::normalizer::normalize;
use crate::oracle::{CompletionOracle, OllamaOracle};
use crate::registry::ProviderRegistry;
use crate::scoring::{HttpScorer, ScoreService};
use crate::selector::SourceSelector;
use crate::session::ReportStore;

/// One provider invocation as supplied by the aggregation request.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiCall {
    pub endpoint: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// Result of report creation: the resolved provider addresses, the lookup
/// fields each one requires (index-aligned), and the minted report id.
#[derive(Debug, Clone)]
pub struct ReportPlan {
    pub provider_calls: Vec<String>,
    pub field_requirements: Vec<Vec<String>>,
    pub report_id: String,
}

/// Result of the aggregation and scoring flow.
#[derive(Debug, Clone)]
pub struct AggregateOutput {
    pub insights: String,
    pub risk_score: f64,
    pub formatted_data: CanonicalRecord,
}

pub struct Pipeline {
    registry: Arc<ProviderRegistry>,
    selector: SourceSelector,
    aggregator: FanOutAggregator,
    scorer: Arc<dyn ScoreService>,
    insights: InsightGenerator,
    store: ReportStore,
    provider_base_url: String,
}

impl Pipeline {
    /// Wire the pipeline from explicit collaborators. Tests substitute
    /// deterministic oracle/transport/scorer implementations here.
    pub fn new(
        registry: Arc<ProviderRegistry>,
        oracle: Arc<dyn CompletionOracle>,
        transport: Arc<dyn ProviderTransport>,
        scorer: Arc<dyn ScoreService>,
        provider_base_url: String,
    ) -> Self {
        Self {
            selector: SourceSelector::new(Arc::clone(&oracle), Arc::clone(&registry)),
            insights: InsightGenerator::new(oracle),
            aggregator: FanOutAggregator::new(transport),
            registry,
            scorer,
            store: ReportStore::new(),
            provider_base_url,
        }
    }

    /// Wire the pipeline with production HTTP collaborators.
    pub fn from_config(config: &Config) -> Self {
        let oracle: Arc<dyn CompletionOracle> = Arc::new(OllamaOracle::new(&config.oracle));
        let transport: Arc<dyn ProviderTransport> = Arc::new(HttpTransport::new(&config.providers));
        let scorer: Arc<dyn ScoreService> = Arc::new(HttpScorer::new(&config.scorer));

        Self::new(
            Arc::new(ProviderRegistry::standard()),
            oracle,
            transport,
            scorer,
            config.providers.base_url.clone(),
        )
    }

    /// The report session store. Exposed for handlers that only need to
    /// read session state.
    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    /// Flow 1: classify the context, plan the provider calls, mint the
    /// report. Selection happens before minting, so a selection failure
    /// leaves no report behind.
    pub async fn create_report(&self, context: &Value) -> Result<ReportPlan, RiskweaveError> {
        let selection = self.selector.select(context).await?;
        info!(
            "Selected {} of {} providers",
            selection.provider_ids.len(),
            self.registry.len()
        );

        let mut provider_calls = Vec::new();
        let mut field_requirements = Vec::new();
        for id in &selection.provider_ids {
            // Selection only yields registry ids, so this cannot miss.
            let descriptor = self.registry.describe(*id)?;
            provider_calls.push(format!(
                "{}{}",
                self.provider_base_url, descriptor.endpoint_path
            ));
            field_requirements.push(descriptor.required_fields.clone());
        }

        let report_id = self.store.create().await;

        Ok(ReportPlan {
            provider_calls,
            field_requirements,
            report_id,
        })
    }

    /// Flow 2: fan out the supplied provider calls, normalize the outcomes,
    /// score the record, and fold the score into a narrative. The canonical
    /// record is attached to the report before scoring so the report
    /// survives a scorer failure with `risk_score = None`.
    pub async fn aggregate_and_score(
        &self,
        report_id: &str,
        api_calls: Vec<ApiCall>,
    ) -> Result<AggregateOutput, RiskweaveError> {
        // Fail fast on an unknown report before any network work.
        self.store.checkout(report_id).await?;

        let calls: Vec<ProviderCall> = api_calls
            .into_iter()
            .map(|c| {
                let mut call = ProviderCall::new(c.endpoint, c.fields);
                call.inject_report_id(report_id);
                call
            })
            .collect();

        let outcomes = self.aggregator.execute(&calls).await;
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        info!(
            "Report {}: {}/{} provider calls succeeded",
            report_id,
            succeeded,
            outcomes.len()
        );

        let record = normalize(&outcomes);
        self.store.attach_record(report_id, record.clone()).await?;

        let reply = self.scorer.score(&record).await?;
        self.store.attach_score(report_id, reply.risk_score).await?;

        // The scorer may echo back an enriched profile; prefer it for the
        // narrative, falling back to our own record.
        let profile = if reply.data.is_null() {
            serde_json::to_value(&record).unwrap_or(Value::Null)
        } else {
            reply.data
        };

        let insights = self.insights.generate(reply.risk_score, &profile).await;
        self.store
            .attach_insights(report_id, insights.clone())
            .await?;

        Ok(AggregateOutput {
            insights,
            risk_score: reply.risk_score,
            formatted_data: record,
        })
    }

    /// Flow 3: one chat turn against an existing report. The report's own
    /// lock is held across the narrative call, so turns against the same
    /// report serialize while other reports stay unaffected.
    pub async fn chat(
        &self,
        report_id: &str,
        question: &str,
        insights_override: Option<String>,
    ) -> Result<String, RiskweaveError> {
        if question.trim().is_empty() {
            return Err(RiskweaveError::InvalidRequest(
                "chat query is required".to_string(),
            ));
        }

        let handle = self.store.checkout(report_id).await?;
        let mut report = handle.lock().await;

        if let Some(text) = insights_override {
            report.insights = Some(text);
        }

        report.append_turn(Speaker::User, question.to_string());

        let context = report.insights.clone();
        let reply = self
            .insights
            .chat_reply(report_id, context.as_deref(), question)
            .await;

        report.append_turn(Speaker::Assistant, reply.clone());

        Ok(reply)
    }
}
