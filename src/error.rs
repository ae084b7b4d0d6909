//! Error taxonomy for the orchestration pipeline.
//!
//! Each failure class has its own variant so callers can tell recoverable
//! conditions (a single provider failing, narrative generation falling back)
//! apart from hard failures (selection, scoring).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Top-level error type for pipeline operations.
#[derive(Debug, Error)]
pub enum RiskweaveError {
    /// Source selection failed: the classifier oracle was unreachable or its
    /// reply did not match the expected shape. Hard failure, no report is
    /// produced.
    #[error("source selection failed: {0}")]
    Selection(#[from] SelectionError),

    /// A single provider call failed. Captured per-call inside the fan-out
    /// aggregator and never propagated past it; this variant exists for
    /// diagnostics surfaces.
    #[allow(dead_code)] // Recovered locally as fan-out outcomes in normal operation
    #[error("provider call to {endpoint} failed: {reason}")]
    ProviderCall {
        endpoint: String,
        reason: String,
        connection_failure: bool,
    },

    /// The external scoring service was unreachable or replied with a shape
    /// we cannot use. Hard failure for the aggregation request.
    #[error("scoring service failed: {0}")]
    Scoring(#[from] ScoringServiceError),

    /// Narrative generation failed. Recovered with a fixed fallback string;
    /// this variant only shows up in logs.
    #[allow(dead_code)] // Recovered with fallback text in normal operation
    #[error("narrative generation failed: {0}")]
    NarrativeGeneration(String),

    /// An operation referenced a report id that was never minted.
    #[error("unknown report id: {0}")]
    UnknownReport(String),

    /// A registry lookup for an id outside the catalog. Configuration bug,
    /// not a runtime retry case.
    #[error("unknown provider id: {0}")]
    UnknownProvider(u32),

    /// The request body was structurally valid but semantically unusable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Failures of the classifier step in source selection.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("classifier oracle unreachable: {0}")]
    OracleUnreachable(String),

    #[error("classifier reply is not the expected shape: {0}")]
    MalformedReply(String),
}

/// Failures of the external risk-scoring service.
#[derive(Debug, Error)]
pub enum ScoringServiceError {
    #[error("scoring service unreachable: {0}")]
    Unreachable(String),

    #[error("scoring service returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("scoring service reply malformed: {0}")]
    MalformedReply(String),
}

impl RiskweaveError {
    /// HTTP status the error maps to when it reaches a handler.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RiskweaveError::Selection(_) | RiskweaveError::Scoring(_) => StatusCode::BAD_GATEWAY,
            RiskweaveError::UnknownReport(_) => StatusCode::NOT_FOUND,
            RiskweaveError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RiskweaveError::ProviderCall { .. }
            | RiskweaveError::NarrativeGeneration(_)
            | RiskweaveError::UnknownProvider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RiskweaveError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
