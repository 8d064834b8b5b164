use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use ecosim_core::domain::record::{CanonicalRecord, CarbonLogEntry, RecordSubmission};
use ecosim_core::domain::scenario::{
    CarbonScenario, Domain, ScenarioPayload, ScenarioRequest, ScenarioResult,
};
use ecosim_core::domain::suggestion::SuggestionOutcome;
use tracing::info;

use super::suggestions::{suggest, SuggestionFacts};
use super::{fail, json_body, ApiResult, AppState, CorrelationId};
use crate::reconcile::{RecordQuery, Resolution};

const CARBON_ALTERNATIVE: &str = "carbon";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_record))
        .route("/latest", get(latest))
        .route("/log", post(log_footprint))
        .route("/simulate", post(simulate))
        .route("/estimate", post(estimate))
        .route("/suggestions", post(suggestions))
}

pub async fn latest(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
) -> ApiResult<Json<Resolution>> {
    let resolution = state
        .reconciler
        .resolve(RecordQuery::Authoritative, correlation_id.as_str())
        .await
        .map_err(|error| fail(error, &correlation_id))?;
    Ok(Json(resolution))
}

pub async fn submit_record(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    body: Result<Json<RecordSubmission>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CanonicalRecord>)> {
    let record = json_body(body, &correlation_id)?
        .into_record(Utc::now())
        .map_err(|error| fail(error, &correlation_id))?;
    persist(&state, record, &correlation_id).await
}

pub async fn log_footprint(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    body: Result<Json<CarbonLogEntry>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CanonicalRecord>)> {
    let record = json_body(body, &correlation_id)?
        .into_record(Utc::now())
        .map_err(|error| fail(error, &correlation_id))?;
    persist(&state, record, &correlation_id).await
}

pub async fn simulate(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    body: Result<Json<CarbonScenario>, JsonRejection>,
) -> ApiResult<Json<ScenarioResult>> {
    let scenario = json_body(body, &correlation_id)?;
    let request = ScenarioRequest::new(CARBON_ALTERNATIVE, ScenarioPayload::Carbon(scenario));

    let result = state
        .simulator
        .simulate(&request, correlation_id.as_str())
        .await
        .map_err(|error| fail(error, &correlation_id))?;
    Ok(Json(result))
}

pub async fn estimate(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    body: Result<Json<CarbonScenario>, JsonRejection>,
) -> ApiResult<Json<Resolution>> {
    let scenario = json_body(body, &correlation_id)?;
    let resolution = state
        .reconciler
        .resolve(RecordQuery::WhatIf(scenario), correlation_id.as_str())
        .await
        .map_err(|error| fail(error, &correlation_id))?;
    Ok(Json(resolution))
}

pub async fn suggestions(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    body: Result<Json<SuggestionFacts>, JsonRejection>,
) -> ApiResult<Json<SuggestionOutcome>> {
    suggest(&state, Domain::Carbon, &correlation_id, body).await
}

async fn persist(
    state: &AppState,
    record: CanonicalRecord,
    correlation_id: &CorrelationId,
) -> ApiResult<(StatusCode, Json<CanonicalRecord>)> {
    let stored = state
        .records
        .insert(record)
        .await
        .map_err(|error| fail(error, correlation_id))?;

    info!(
        event_name = "record.persisted",
        correlation_id = correlation_id.as_str(),
        record_id = %stored.id,
        total = stored.total,
        score = stored.score,
        "canonical record persisted"
    );
    Ok((StatusCode::CREATED, Json(stored)))
}
