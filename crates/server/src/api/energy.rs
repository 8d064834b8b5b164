use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use ecosim_core::domain::activity::{EnergyReading, NewEnergyReading, RECENT_READINGS_LIMIT};
use ecosim_core::domain::scenario::{
    Domain, EnergyScenario, OptimizationHint, OptimizationRequest, ScenarioPayload,
    ScenarioRequest, ScenarioResult,
};
use ecosim_core::domain::suggestion::SuggestionOutcome;
use serde::Serialize;
use tracing::info;

use super::suggestions::{suggest, SuggestionFacts};
use super::{fail, json_body, ApiResult, AppState, CorrelationId};

const ENERGY_ALTERNATIVE: &str = "energy";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/data", get(list_readings).post(record_reading))
        .route("/simulate", post(simulate))
        .route("/analyze", post(analyze))
        .route("/suggestions", post(suggestions))
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub suggestions: Vec<OptimizationHint>,
}

pub async fn list_readings(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
) -> ApiResult<Json<Vec<EnergyReading>>> {
    let readings = state
        .energy_readings
        .list_recent(RECENT_READINGS_LIMIT)
        .await
        .map_err(|error| fail(error, &correlation_id))?;
    Ok(Json(readings))
}

pub async fn record_reading(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    body: Result<Json<NewEnergyReading>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<EnergyReading>)> {
    let reading = json_body(body, &correlation_id)?
        .into_reading(Utc::now())
        .map_err(|error| fail(error, &correlation_id))?;
    let stored =
        state.energy_readings.insert(reading).await.map_err(|error| fail(error, &correlation_id))?;

    info!(
        event_name = "energy.reading.recorded",
        correlation_id = correlation_id.as_str(),
        reading_id = %stored.id,
        sector = %stored.sector,
        "energy reading recorded"
    );
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn simulate(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    body: Result<Json<EnergyScenario>, JsonRejection>,
) -> ApiResult<Json<ScenarioResult>> {
    let scenario = json_body(body, &correlation_id)?;
    let request = ScenarioRequest::new(ENERGY_ALTERNATIVE, ScenarioPayload::Energy(scenario));

    let result = state
        .simulator
        .simulate(&request, correlation_id.as_str())
        .await
        .map_err(|error| fail(error, &correlation_id))?;
    Ok(Json(result))
}

pub async fn analyze(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    body: Result<Json<OptimizationRequest>, JsonRejection>,
) -> ApiResult<Json<AnalysisResponse>> {
    let request = json_body(body, &correlation_id)?;

    let suggestions = state
        .simulator
        .optimize_energy(&request, correlation_id.as_str())
        .await
        .map_err(|error| fail(error, &correlation_id))?;
    Ok(Json(AnalysisResponse { suggestions }))
}

pub async fn suggestions(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    body: Result<Json<SuggestionFacts>, JsonRejection>,
) -> ApiResult<Json<SuggestionOutcome>> {
    suggest(&state, Domain::Energy, &correlation_id, body).await
}
