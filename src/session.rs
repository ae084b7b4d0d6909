//! Report session store.
//!
//! Owns every report's mutable state for its lifetime: the canonical
//! record, the externally supplied score and narrative, and the append-only
//! conversation transcript. Each report sits behind its own async mutex so
//! turns against the same report serialize while different reports never
//! block each other. Reports live until process teardown; there is no
//! deletion API.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::error::RiskweaveError;
use crate::models::{CanonicalRecord, ChatTurn, Report};

/// In-memory store of all live reports, keyed by report id.
pub struct ReportStore {
    reports: RwLock<HashMap<String, Arc<Mutex<Report>>>>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self {
            reports: RwLock::new(HashMap::new()),
        }
    }

    /// Mint a fresh report and return its id. Ids are time-ordered with a
    /// random suffix; collision probability is treated as negligible.
    pub async fn create(&self) -> String {
        let id = mint_report_id();
        info!("Minted report {}", id);

        let report = Report::new(id.clone());
        self.reports
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(report)));
        id
    }

    /// Fetch the handle for one report. Callers that need several mutations
    /// to be atomic (a chat turn pair, for instance) hold the report's own
    /// lock across them.
    pub async fn checkout(&self, id: &str) -> Result<Arc<Mutex<Report>>, RiskweaveError> {
        self.reports
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RiskweaveError::UnknownReport(id.to_string()))
    }

    pub async fn len(&self) -> usize {
        self.reports.read().await.len()
    }

    /// Attach the canonical record produced by normalization.
    pub async fn attach_record(
        &self,
        id: &str,
        record: CanonicalRecord,
    ) -> Result<(), RiskweaveError> {
        let handle = self.checkout(id).await?;
        handle.lock().await.record = Some(record);
        Ok(())
    }

    /// Attach the externally computed risk score.
    pub async fn attach_score(&self, id: &str, score: f64) -> Result<(), RiskweaveError> {
        let handle = self.checkout(id).await?;
        handle.lock().await.risk_score = Some(score);
        Ok(())
    }

    /// Attach (or replace) the narrative insight text.
    pub async fn attach_insights(&self, id: &str, insights: String) -> Result<(), RiskweaveError> {
        let handle = self.checkout(id).await?;
        handle.lock().await.insights = Some(insights);
        Ok(())
    }

    /// The full ordered transcript.
    pub async fn transcript(&self, id: &str) -> Result<Vec<ChatTurn>, RiskweaveError> {
        let handle = self.checkout(id).await?;
        let report = handle.lock().await;
        Ok(report.transcript.clone())
    }

    /// A point-in-time clone of the report, for read-only inspection.
    pub async fn snapshot(&self, id: &str) -> Result<Report, RiskweaveError> {
        let handle = self.checkout(id).await?;
        let report = handle.lock().await;
        Ok(report.clone())
    }
}

impl Default for ReportStore {
    fn default() -> Self {
        Self::new()
    }
}

/// `REP-{unix millis}-{6 random alphanumerics}`.
fn mint_report_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect();
    format!("REP-{}-{}", Utc::now().timestamp_millis(), suffix)
}
