//! API route handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::{debug, info};

use warden_core::PromptRecord;

use crate::error::{ApiError, Result};
use crate::models::{HealthResponse, PromptRequest};
use crate::state::AppState;

type Payload = std::result::Result<Json<PromptRequest>, JsonRejection>;

/// POST /preprocess_prompt - Run the full pipeline on a prompt.
pub async fn preprocess_prompt(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<PromptRecord>> {
    let Json(req) = payload?;
    debug!(
        prompt_len = req.prompt.as_deref().map(str::len),
        "Preprocessing prompt"
    );

    let run = state.pipeline.run(req.prompt.as_deref());
    let record = tokio::time::timeout(state.request_timeout, run)
        .await
        .map_err(|_| ApiError::Timeout(state.request_timeout))??;

    info!(
        risk_level = %record.risk_level(),
        status = ?record.status,
        latency_ms = record.latency_ms,
        "Prompt preprocessed"
    );
    Ok(Json(record))
}

/// POST /validate_prompt - Validation and completeness only.
pub async fn validate_prompt(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<PromptRecord>> {
    let Json(req) = payload?;
    debug!(
        prompt_len = req.prompt.as_deref().map(str::len),
        "Validating prompt"
    );

    let record = state.pipeline.validate_only(req.prompt.as_deref())?;
    Ok(Json(record))
}

/// POST /detect_language_risks - Validation and the language lexicon only.
pub async fn detect_language_risks(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<PromptRecord>> {
    let Json(req) = payload?;
    debug!(
        prompt_len = req.prompt.as_deref().map(str::len),
        "Checking language risks"
    );

    let record = state.pipeline.language_risks(req.prompt.as_deref())?;
    debug!(risk_level = %record.risk_level(), "Language check complete");
    Ok(Json(record))
}

/// OPTIONS on any route - CORS preflight.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// GET /health - Liveness check.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}
