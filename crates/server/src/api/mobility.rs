use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use ecosim_core::domain::activity::{MobilityTrip, NewMobilityTrip, RECENT_READINGS_LIMIT};
use ecosim_core::domain::scenario::{
    AlternativeId, Domain, MobilityScenario, ScenarioPayload, ScenarioRequest, ScenarioResult,
    TransportMode,
};
use ecosim_core::domain::suggestion::SuggestionOutcome;
use ecosim_engine::ComparisonReport;
use serde::Deserialize;
use tracing::info;

use super::suggestions::{suggest, SuggestionFacts};
use super::{fail, json_body, ApiResult, AppState, CorrelationId};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_trips).post(record_trip))
        .route("/calculate", post(calculate))
        .route("/compare", post(compare_modes))
        .route("/suggestions", post(suggestions))
}

/// One trip evaluated under several transport modes.
#[derive(Debug, Deserialize)]
pub struct CompareModesRequest {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default, alias = "distance")]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub modes: Option<Vec<TransportMode>>,
    #[serde(default)]
    pub baseline: Option<TransportMode>,
}

pub async fn list_trips(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
) -> ApiResult<Json<Vec<MobilityTrip>>> {
    let trips = state
        .trips
        .list_recent(RECENT_READINGS_LIMIT)
        .await
        .map_err(|error| fail(error, &correlation_id))?;
    Ok(Json(trips))
}

pub async fn record_trip(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    body: Result<Json<NewMobilityTrip>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MobilityTrip>)> {
    let trip = json_body(body, &correlation_id)?
        .into_trip(Utc::now())
        .map_err(|error| fail(error, &correlation_id))?;
    let stored = state.trips.insert(trip).await.map_err(|error| fail(error, &correlation_id))?;

    info!(
        event_name = "mobility.trip.recorded",
        correlation_id = correlation_id.as_str(),
        trip_id = %stored.id,
        transport_mode = %stored.transport_mode,
        "mobility trip recorded"
    );
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn calculate(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    body: Result<Json<MobilityScenario>, JsonRejection>,
) -> ApiResult<Json<ScenarioResult>> {
    let scenario = json_body(body, &correlation_id)?;
    let request = ScenarioRequest::new(scenario.mode.as_str(), ScenarioPayload::Mobility(scenario));

    let result = state
        .simulator
        .simulate(&request, correlation_id.as_str())
        .await
        .map_err(|error| fail(error, &correlation_id))?;
    Ok(Json(result))
}

pub async fn compare_modes(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    body: Result<Json<CompareModesRequest>, JsonRejection>,
) -> ApiResult<Json<ComparisonReport>> {
    let request = json_body(body, &correlation_id)?;
    let modes = request.modes.unwrap_or_else(|| TransportMode::COMPARISON_DEFAULTS.to_vec());
    let baseline = request.baseline.unwrap_or(TransportMode::Car);

    let alternatives = modes
        .into_iter()
        .map(|mode| {
            ScenarioRequest::new(
                mode.as_str(),
                ScenarioPayload::Mobility(MobilityScenario {
                    start: request.start.clone(),
                    end: request.end.clone(),
                    mode,
                    distance_km: request.distance_km,
                }),
            )
        })
        .collect();

    let report = state
        .orchestrator
        .compare_and_select(AlternativeId::new(baseline.as_str()), alternatives, correlation_id.as_str())
        .await
        .map_err(|error| fail(error, &correlation_id))?;
    Ok(Json(report))
}

pub async fn suggestions(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    body: Result<Json<SuggestionFacts>, JsonRejection>,
) -> ApiResult<Json<SuggestionOutcome>> {
    suggest(&state, Domain::Mobility, &correlation_id, body).await
}
