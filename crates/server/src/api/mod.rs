//! JSON API.
//!
//! - `GET  /api/energy/data`           recent energy readings
//! - `POST /api/energy/data`           ingest one energy reading
//! - `POST /api/energy/simulate`       energy scenario
//! - `POST /api/energy/analyze`        optimisation hints
//! - `GET  /api/mobility`              logged trips, newest first
//! - `POST /api/mobility`              log one trip
//! - `POST /api/mobility/calculate`    one mobility alternative
//! - `POST /api/mobility/compare`      transport modes side by side
//! - `GET  /api/carbon/latest`         current canonical record
//! - `POST /api/carbon`                submit a full record
//! - `POST /api/carbon/log`            submit per-category figures
//! - `POST /api/carbon/simulate`       carbon scenario
//! - `POST /api/carbon/estimate`       what-if record, not persisted
//! - `POST /api/compare`               arbitrary alternatives
//! - `POST /api/{domain}/suggestions`  advice with catalog fallback

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use ecosim_advisor::SuggestionStrategy;
use ecosim_core::errors::{ApplicationError, DomainError, InterfaceError};
use ecosim_db::{EnergyReadingRepository, MobilityTripRepository, RecordRepository};
use ecosim_engine::{ComparisonOrchestrator, ScenarioEngine, ScenarioSimulator};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use uuid::Uuid;

use crate::reconcile::RecordReconciler;

pub mod carbon;
pub mod compare;
pub mod energy;
pub mod mobility;
mod suggestions;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct AppState {
    pub(crate) records: Arc<dyn RecordRepository>,
    pub(crate) energy_readings: Arc<dyn EnergyReadingRepository>,
    pub(crate) trips: Arc<dyn MobilityTripRepository>,
    pub(crate) simulator: ScenarioSimulator,
    pub(crate) orchestrator: ComparisonOrchestrator,
    pub(crate) reconciler: Arc<RecordReconciler>,
    pub(crate) advisor: Arc<SuggestionStrategy>,
}

/// Storage handles backing the API.
pub struct Repositories {
    pub records: Arc<dyn RecordRepository>,
    pub energy_readings: Arc<dyn EnergyReadingRepository>,
    pub trips: Arc<dyn MobilityTripRepository>,
}

impl AppState {
    pub fn new(
        repositories: Repositories,
        engine: Arc<dyn ScenarioEngine>,
        advisor: SuggestionStrategy,
        synthesize_on_read: bool,
    ) -> Self {
        let simulator = ScenarioSimulator::new(engine);
        let reconciler = RecordReconciler::new(
            repositories.records.clone(),
            simulator.clone(),
            synthesize_on_read,
        );

        Self {
            records: repositories.records,
            energy_readings: repositories.energy_readings,
            trips: repositories.trips,
            orchestrator: ComparisonOrchestrator::new(simulator.clone()),
            simulator,
            reconciler: Arc::new(reconciler),
            advisor: Arc::new(advisor),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/energy", energy::router())
        .nest("/api/mobility", mobility::router())
        .nest("/api/carbon", carbon::router())
        .route("/api/compare", post(compare::compare))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Caller-supplied `x-correlation-id`, or a fresh one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CorrelationId {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let supplied = parts
            .headers
            .get(CORRELATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty() && value.len() <= 128);

        Ok(Self(match supplied {
            Some(value) => value.to_string(),
            None => format!("req-{}", Uuid::new_v4()),
        }))
    }
}

#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
    correlation_id: &'a str,
}

impl ApiError {
    pub fn new(error: ApplicationError, correlation_id: &CorrelationId) -> Self {
        Self(error.into_interface(correlation_id.as_str()))
    }

    pub fn status(&self) -> StatusCode {
        match self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Simulation { .. } | InterfaceError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let correlation_id = self.0.correlation_id().to_string();

        if status.is_server_error() {
            error!(
                event_name = "api.request.failed",
                correlation_id = %correlation_id,
                status = status.as_u16(),
                error = %self.0,
                "request failed"
            );
        } else {
            warn!(
                event_name = "api.request.rejected",
                correlation_id = %correlation_id,
                status = status.as_u16(),
                error = %self.0,
                "request rejected"
            );
        }

        let body = ErrorBody {
            message: self.0.user_message(),
            detail: self.0.detail(),
            correlation_id: &correlation_id,
        };
        let mut response = (status, Json(body)).into_response();
        if let Ok(value) = HeaderValue::from_str(&correlation_id) {
            response.headers_mut().insert(CORRELATION_HEADER, value);
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Unwraps a JSON body, turning extractor rejections into 400 responses.
pub(crate) fn json_body<T>(
    body: Result<Json<T>, JsonRejection>,
    correlation_id: &CorrelationId,
) -> ApiResult<T> {
    body.map(|Json(value)| value).map_err(|rejection| {
        ApiError::new(
            ApplicationError::Domain(DomainError::Validation(rejection.body_text())),
            correlation_id,
        )
    })
}

pub(crate) fn fail(error: impl Into<ApplicationError>, correlation_id: &CorrelationId) -> ApiError {
    ApiError::new(error.into(), correlation_id)
}
