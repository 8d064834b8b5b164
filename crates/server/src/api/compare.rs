use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use ecosim_core::domain::scenario::{AlternativeId, ScenarioRequest};
use ecosim_engine::ComparisonReport;
use serde::Deserialize;

use super::{fail, json_body, ApiResult, AppState, CorrelationId};

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub baseline_id: AlternativeId,
    pub alternatives: Vec<ScenarioRequest>,
}

pub async fn compare(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    body: Result<Json<CompareRequest>, JsonRejection>,
) -> ApiResult<Json<ComparisonReport>> {
    let request = json_body(body, &correlation_id)?;

    let report = state
        .orchestrator
        .compare_and_select(request.baseline_id, request.alternatives, correlation_id.as_str())
        .await
        .map_err(|error| fail(error, &correlation_id))?;
    Ok(Json(report))
}
