use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{ComparisonResult, JobStatus, RunId, UserId},
    services::StartOutcome,
};

use super::AppState;

// Request/Response types

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TriggerOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub user: UserId,
    pub outcome: TriggerOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    #[default]
    Json,
    Tsv,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResultQuery {
    #[serde(default)]
    pub format: ResultFormat,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Starts a comparison run for a user and returns without waiting for it
pub async fn trigger_comparison(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(user_id): Path<String>,
) -> AppResult<(StatusCode, Json<TriggerResponse>)> {
    let user = UserId::parse(user_id)?;

    let response = match state.comparisons.start(user.clone()).await? {
        StartOutcome::Started { run_id, .. } => {
            tracing::info!(request_id = %request_id, user = %user, run_id = %run_id, "Comparison triggered");
            TriggerResponse {
                user,
                outcome: TriggerOutcome::Started,
                run_id: Some(run_id),
            }
        }
        StartOutcome::AlreadyRunning => {
            tracing::info!(request_id = %request_id, user = %user, "Comparison already in flight");
            TriggerResponse {
                user,
                outcome: TriggerOutcome::AlreadyRunning,
                run_id: None,
            }
        }
    };

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Progress percentage as plain text, "0" before any run
pub async fn get_progress(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<String> {
    let user = UserId::parse(user_id)?;
    let percent = state.store.get_progress(&user).await?;
    Ok(percent.to_string())
}

/// Stored comparison table, empty body until the run completes
pub async fn get_result(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<ResultQuery>,
) -> AppResult<Response> {
    let user = UserId::parse(user_id)?;
    let payload = state.store.get_result(&user).await?;

    let response = match query.format {
        ResultFormat::Json => {
            ([(header::CONTENT_TYPE, "application/json")], payload).into_response()
        }
        ResultFormat::Tsv => {
            let body = if payload.is_empty() {
                String::new()
            } else {
                ComparisonResult::from_payload(&payload)?.to_tsv()
            };
            ([(header::CONTENT_TYPE, "text/tab-separated-values")], body).into_response()
        }
    };

    Ok(response)
}

/// Run state, progress and last error for a user
pub async fn get_status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<JobStatus>> {
    let user = UserId::parse(user_id)?;
    let status = state
        .store
        .get_status(&user)
        .await?
        .unwrap_or_else(|| JobStatus::not_started(user));
    Ok(Json(status))
}
