use axum::{extract::State, Json};
use tracing::{error, warn};

use service::regression::{self, RegressionResult};

use crate::errors::ApiError;
use crate::state::ServerState;

/// Per-question regression over every stored response with six numeric answers.
pub async fn regression(State(state): State<ServerState>) -> Result<Json<Vec<RegressionResult>>, ApiError> {
    let responses = state.responses.list().await.map_err(|e| {
        error!(error = %e, "error reading responses for regression");
        ApiError::Internal("Failed to calculate regression")
    })?;

    let results = regression::analyze(&responses).map_err(|e| {
        warn!(error = %e, "regression not available");
        ApiError::BadRequest("Need at least 6 responses for regression analysis")
    })?;
    if results.is_empty() {
        return Err(ApiError::Internal("Unable to calculate regression models"));
    }
    Ok(Json(results))
}
