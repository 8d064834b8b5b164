use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use ecosim_db::DbPool;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    engine_program: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub database: HealthCheck,
    pub engine: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool, engine_program: impl Into<String>) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(HealthState { db_pool, engine_program: engine_program.into() })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let engine = engine_check(&state.engine_program);
    // a missing engine degrades simulations but not the rest of the API
    let ready = database.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "ecosim-server runtime initialized".to_string(),
        },
        database,
        engine,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

fn engine_check(program: &str) -> HealthCheck {
    match which::which(program) {
        Ok(path) => HealthCheck {
            status: "ready",
            detail: format!("engine program resolved to {}", path.display()),
        },
        Err(_) => HealthCheck {
            status: "degraded",
            detail: format!("engine program `{program}` is not on PATH"),
        },
    }
}
