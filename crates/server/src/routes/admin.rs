use axum::{extract::{rejection::JsonRejection, State}, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use service::{samples::{self, Distribution}, SurveyResponse};

use crate::errors::ApiError;
use crate::state::ServerState;

#[derive(Serialize, Debug)]
pub struct ClearOutput {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Deserialize, Debug)]
pub struct GenerateInput {
    pub num_responses: usize,
    #[serde(default)]
    pub distribution_type: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct GenerateOutput {
    pub success: bool,
    pub generated: usize,
    pub total: usize,
}

/// Check the `password` field of an admin request body.
/// Unparsable bodies count as a missing password.
fn authorize(state: &ServerState, body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    let body = body.map(|Json(v)| v).unwrap_or(Value::Null);
    let password = body.get("password").and_then(Value::as_str);
    if !state.is_admin_password(password) {
        return Err(ApiError::Unauthorized);
    }
    Ok(body)
}

pub async fn clear(
    State(state): State<ServerState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ClearOutput>, ApiError> {
    authorize(&state, body)?;
    state.responses.clear().await.map_err(|e| {
        error!(error = %e, "error clearing data");
        ApiError::Internal("Failed to clear data")
    })?;
    Ok(Json(ClearOutput { success: true, message: "All data cleared" }))
}

/// Same payload as `GET /api/responses`, behind the admin password.
pub async fn export(
    State(state): State<ServerState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Vec<SurveyResponse>>, ApiError> {
    authorize(&state, body)?;
    let items = state.responses.list().await.map_err(|e| {
        error!(error = %e, "error exporting data");
        ApiError::Internal("Failed to export data")
    })?;
    Ok(Json(items))
}

/// Append synthetic responses, e.g. to seed a demo deployment.
pub async fn generate(
    State(state): State<ServerState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<GenerateOutput>, ApiError> {
    let body = authorize(&state, body)?;
    let input: GenerateInput =
        serde_json::from_value(body).map_err(|_| ApiError::BadRequest("Invalid generate request"))?;
    let distribution = Distribution::from_name(input.distribution_type.as_deref().unwrap_or("uniform"));

    let records = samples::generate_now(input.num_responses, distribution)
        .map_err(|_| ApiError::BadRequest("Invalid generate request"))?;
    let generated = records.len();
    let total = state.responses.append_many(records).await.map_err(|e| {
        error!(error = %e, "error generating data");
        ApiError::Internal("Failed to generate data")
    })?;
    info!(generated, total, ?distribution, "generated synthetic responses");
    Ok(Json(GenerateOutput { success: true, generated, total }))
}
