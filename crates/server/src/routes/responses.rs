use axum::{extract::{rejection::JsonRejection, State}, Json};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use service::{survey::validate_submission, SurveyResponse};

use crate::errors::ApiError;
use crate::state::ServerState;

#[derive(Serialize, Debug)]
pub struct SubmitOutput {
    pub success: bool,
    pub count: usize,
}

#[derive(Serialize, Debug)]
pub struct CountOutput {
    pub count: usize,
}

/// Store one survey response. Requires a truthy `timestamp`.
pub async fn submit(
    State(state): State<ServerState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SubmitOutput>, ApiError> {
    let Json(body) = body.map_err(|e| {
        warn!(error = %e, "rejected survey response body");
        ApiError::BadRequest("Invalid response data")
    })?;
    let record = validate_submission(body).map_err(|e| {
        warn!(error = %e, "rejected survey response");
        ApiError::BadRequest("Invalid response data")
    })?;

    let count = state.responses.append(record).await.map_err(|e| {
        error!(error = %e, "error saving response");
        ApiError::Internal("Failed to save response")
    })?;
    Ok(Json(SubmitOutput { success: true, count }))
}

/// All stored responses in submission order.
pub async fn list(State(state): State<ServerState>) -> Result<Json<Vec<SurveyResponse>>, ApiError> {
    let items = state.responses.list().await.map_err(|e| {
        error!(error = %e, "error reading responses");
        ApiError::Internal("Failed to read responses")
    })?;
    Ok(Json(items))
}

pub async fn count(State(state): State<ServerState>) -> Result<Json<CountOutput>, ApiError> {
    let count = state.responses.count().await.map_err(|e| {
        error!(error = %e, "error reading count");
        ApiError::Internal("Failed to read count")
    })?;
    Ok(Json(CountOutput { count }))
}
