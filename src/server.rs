//! HTTP surface over the orchestration pipeline.
//!
//! Handlers are deliberately thin: deserialize, delegate to the pipeline,
//! serialize. The report id is an explicit required field on every call
//! after creation; there is no cookie or other transport-level session
//! state.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::RiskweaveError;
use crate::models::{CanonicalRecord, ChatTurn, Report};
use crate::pipeline::{ApiCall, Pipeline};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

/// Build the service router.
pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/report/new", post(new_report))
        .route("/api/report/aggregate", post(aggregate))
        .route("/api/report/chat", post(chat))
        .route("/api/report/:id", get(report_snapshot))
        .route("/api/report/:id/transcript", get(report_transcript))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { pipeline })
}

/// Bind and serve until the process is torn down.
pub async fn serve(addr: SocketAddr, pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);
    axum::serve(listener, router(pipeline)).await?;
    Ok(())
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "reports": state.pipeline.store().len().await,
    }))
}

/// Read-only view of a report's current state.
async fn report_snapshot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Report>, RiskweaveError> {
    let report = state.pipeline.store().snapshot(&id).await?;
    Ok(Json(report))
}

async fn report_transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ChatTurn>>, RiskweaveError> {
    let transcript = state.pipeline.store().transcript(&id).await?;
    Ok(Json(transcript))
}

#[derive(Debug, Deserialize)]
struct NewReportRequest {
    context: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewReportResponse {
    provider_calls: Vec<String>,
    field_requirements: Vec<Vec<String>>,
    report_id: String,
}

async fn new_report(
    State(state): State<AppState>,
    Json(request): Json<NewReportRequest>,
) -> Result<Json<NewReportResponse>, RiskweaveError> {
    let plan = state.pipeline.create_report(&request.context).await?;

    Ok(Json(NewReportResponse {
        provider_calls: plan.provider_calls,
        field_requirements: plan.field_requirements,
        report_id: plan.report_id,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregateRequest {
    report_id: String,
    api_calls: Vec<ApiCall>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregateResponse {
    insights: String,
    risk_score: f64,
    formatted_data: CanonicalRecord,
}

async fn aggregate(
    State(state): State<AppState>,
    Json(request): Json<AggregateRequest>,
) -> Result<Json<AggregateResponse>, RiskweaveError> {
    let output = state
        .pipeline
        .aggregate_and_score(&request.report_id, request.api_calls)
        .await?;

    Ok(Json(AggregateResponse {
        insights: output.insights,
        risk_score: output.risk_score,
        formatted_data: output.formatted_data,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    chat: String,
    report_id: String,
    #[serde(default)]
    insights: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    message: String,
    chat_response: String,
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, RiskweaveError> {
    let reply = state
        .pipeline
        .chat(&request.report_id, &request.chat, request.insights)
        .await?;

    Ok(Json(ChatResponse {
        message: "Success".to_string(),
        chat_response: reply,
    }))
}
