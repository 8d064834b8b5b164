use std::sync::Arc;

use ecosim_advisor::{AdvisorError, SuggestionStrategy};
use ecosim_core::config::{AppConfig, ConfigError, LoadOptions};
use ecosim_db::{
    connect_with_settings, migrations, DbPool, SqlEnergyReadingRepository,
    SqlMobilityTripRepository, SqlRecordRepository,
};
use ecosim_engine::ProcessEngine;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{AppState, Repositories};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("advisor setup failed: {0}")]
    Advisor(#[from] AdvisorError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let engine = ProcessEngine::from_config(&config.engine);
    if which::which(engine.program()).is_err() {
        warn!(
            event_name = "system.bootstrap.engine_unresolved",
            correlation_id = "bootstrap",
            program = %engine.program(),
            "engine program is not on PATH; simulations will fail until it is installed"
        );
    }

    let advisor = SuggestionStrategy::from_config(&config.advisor)?;
    info!(
        event_name = "system.bootstrap.advisor_ready",
        correlation_id = "bootstrap",
        remote = advisor.is_remote_enabled(),
        "suggestion strategy initialized"
    );

    let repositories = Repositories {
        records: Arc::new(SqlRecordRepository::new(db_pool.clone())),
        energy_readings: Arc::new(SqlEnergyReadingRepository::new(db_pool.clone())),
        trips: Arc::new(SqlMobilityTripRepository::new(db_pool.clone())),
    };
    let state = AppState::new(
        repositories,
        Arc::new(engine),
        advisor,
        config.records.synthesize_on_read,
    );

    Ok(Application { config, db_pool, state })
}

#[cfg(test)]
mod tests {
    use ecosim_core::config::{ConfigOverrides, LlmProvider, LoadOptions};

    use crate::bootstrap::{bootstrap, BootstrapError};

    fn overrides(database_url: &str) -> ConfigOverrides {
        ConfigOverrides {
            database_url: Some(database_url.to_string()),
            ..ConfigOverrides::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations() {
        let app = bootstrap(LoadOptions {
            config_path: Some("/nonexistent/ecosim.toml".into()),
            overrides: overrides("sqlite::memory:"),
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed with defaults");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('canonical_record', 'energy_reading', 'mobility_trip')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected tables to be available after bootstrap");
        assert_eq!(table_count, 3);

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_when_enabled_advisor_lacks_credentials() {
        let result = bootstrap(LoadOptions {
            config_path: Some("/nonexistent/ecosim.toml".into()),
            overrides: ConfigOverrides {
                advisor_enabled: Some(true),
                advisor_provider: Some(LlmProvider::Anthropic),
                ..overrides("sqlite::memory:")
            },
            ..LoadOptions::default()
        })
        .await;

        let error = result.err().expect("bootstrap should fail");
        assert!(matches!(error, BootstrapError::Config(_)));
        assert!(error.to_string().contains("advisor"));
    }
}
