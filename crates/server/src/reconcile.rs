//! Record Reconciler.
//!
//! Resolves "the current sustainability record" from persisted state, creating
//! the default record on first read when configured to, or shaping a what-if
//! carbon scenario into an unpersisted record.

use std::sync::Arc;

use chrono::Utc;
use ecosim_core::domain::record::CanonicalRecord;
use ecosim_core::domain::scenario::{CarbonScenario, ScenarioPayload, ScenarioRequest};
use ecosim_core::errors::ApplicationError;
use ecosim_db::{seed_default_record, RecordRepository, SeedOutcome};
use ecosim_engine::ScenarioSimulator;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;

const WHAT_IF_ALTERNATIVE: &str = "what-if";

#[derive(Clone, Debug, PartialEq)]
pub enum RecordQuery {
    /// Latest persisted record, or the default when none exists yet.
    Authoritative,
    /// Estimate for a hypothetical carbon scenario. Never persisted.
    WhatIf(CarbonScenario),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Persisted,
    Synthesized,
    Simulated,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Resolution {
    #[serde(flatten)]
    pub record: CanonicalRecord,
    pub source: ResolutionSource,
}

pub struct RecordReconciler {
    records: Arc<dyn RecordRepository>,
    simulator: ScenarioSimulator,
    synthesize_on_read: bool,
    // Serializes default-record creation within this process. Separate
    // processes sharing one database can still both create a default.
    synthesis: Mutex<()>,
}

impl RecordReconciler {
    pub fn new(
        records: Arc<dyn RecordRepository>,
        simulator: ScenarioSimulator,
        synthesize_on_read: bool,
    ) -> Self {
        Self { records, simulator, synthesize_on_read, synthesis: Mutex::new(()) }
    }

    pub async fn resolve(
        &self,
        query: RecordQuery,
        correlation_id: &str,
    ) -> Result<Resolution, ApplicationError> {
        match query {
            RecordQuery::Authoritative => self.authoritative(correlation_id).await,
            RecordQuery::WhatIf(scenario) => self.what_if(scenario, correlation_id).await,
        }
    }

    async fn authoritative(&self, correlation_id: &str) -> Result<Resolution, ApplicationError> {
        if let Some(record) = self.latest_valid().await? {
            return Ok(Resolution { record, source: ResolutionSource::Persisted });
        }

        if !self.synthesize_on_read {
            return Err(ApplicationError::NotFound(
                "no canonical record has been persisted; run `ecosim seed` to create the default"
                    .to_string(),
            ));
        }

        let _guard = self.synthesis.lock().await;
        // seeding re-checks under the lock, so a concurrent reader that won the
        // race is observed here instead of writing a second default
        match seed_default_record(self.records.as_ref(), Utc::now()).await? {
            SeedOutcome::Created(record) => {
                info!(
                    event_name = "record.default.synthesized",
                    correlation_id,
                    record_id = %record.id,
                    "no usable record persisted; default record created"
                );
                Ok(Resolution { record, source: ResolutionSource::Synthesized })
            }
            SeedOutcome::AlreadyPresent(record) => {
                Ok(Resolution { record, source: ResolutionSource::Persisted })
            }
        }
    }

    async fn what_if(
        &self,
        scenario: CarbonScenario,
        correlation_id: &str,
    ) -> Result<Resolution, ApplicationError> {
        let request = ScenarioRequest::new(WHAT_IF_ALTERNATIVE, ScenarioPayload::Carbon(scenario));
        let result = self.simulator.simulate(&request, correlation_id).await?;

        Ok(Resolution {
            record: CanonicalRecord::estimate_from(&result, Utc::now()),
            source: ResolutionSource::Simulated,
        })
    }

    async fn latest_valid(&self) -> Result<Option<CanonicalRecord>, ApplicationError> {
        let latest = self.records.find_latest().await?;
        Ok(latest.and_then(|document| document.into_canonical()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use ecosim_core::domain::comparison::FailureKind;
    use ecosim_core::domain::record::{
        Period, RecordBreakdown, RecordDocument, RecordId, RecordOrigin, RecordSubmission,
    };
    use ecosim_core::domain::scenario::CarbonScenario;
    use ecosim_core::errors::ApplicationError;
    use ecosim_db::{InMemoryRecordRepository, RecordRepository};
    use ecosim_engine::testing::ScriptedEngine;
    use ecosim_engine::{EngineError, ScenarioSimulator};
    use serde_json::json;

    use super::{RecordQuery, RecordReconciler, ResolutionSource};

    fn reconciler(
        repo: Arc<InMemoryRecordRepository>,
        engine: ScriptedEngine,
        synthesize_on_read: bool,
    ) -> RecordReconciler {
        RecordReconciler::new(
            repo,
            ScenarioSimulator::new(Arc::new(engine)),
            synthesize_on_read,
        )
    }

    #[tokio::test]
    async fn empty_store_synthesizes_default_once() {
        let repo = Arc::new(InMemoryRecordRepository::default());
        let reconciler = reconciler(repo.clone(), ScriptedEngine::default(), true);

        let first = reconciler.resolve(RecordQuery::Authoritative, "corr-1").await.expect("first");
        assert_eq!(first.source, ResolutionSource::Synthesized);
        assert_eq!(first.record.total, 4500.0);
        assert_eq!(first.record.score, 65.0);
        assert_eq!(first.record.period, Period::Monthly);

        let second = reconciler.resolve(RecordQuery::Authoritative, "corr-2").await.expect("second");
        assert_eq!(second.source, ResolutionSource::Persisted);
        assert_eq!(second.record, first.record);

        let third = reconciler.resolve(RecordQuery::Authoritative, "corr-3").await.expect("third");
        assert_eq!(third, second);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn future_dated_legacy_document_does_not_trigger_repeated_synthesis() {
        let repo = Arc::new(InMemoryRecordRepository::default());
        let legacy_at = Utc::now() + Duration::days(365 * 70);
        repo.push_document(RecordDocument {
            id: RecordId("REC-legacy".to_string()),
            generated_at: legacy_at,
            period: Period::Weekly,
            total: None,
            breakdown: RecordBreakdown::default(),
            score: 0.0,
            origin: RecordOrigin::Submitted,
        })
        .await;
        let reconciler = reconciler(repo.clone(), ScriptedEngine::default(), true);

        let first = reconciler.resolve(RecordQuery::Authoritative, "corr-6").await.expect("first");
        let second = reconciler.resolve(RecordQuery::Authoritative, "corr-7").await.expect("second");

        assert_eq!(first.source, ResolutionSource::Synthesized);
        assert!(first.record.generated_at > legacy_at);
        assert_eq!(second.source, ResolutionSource::Persisted);
        assert_eq!(second.record, first.record);
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn concurrent_first_reads_create_a_single_default() {
        let repo = Arc::new(InMemoryRecordRepository::default());
        let reconciler = Arc::new(reconciler(repo.clone(), ScriptedEngine::default(), true));

        let mut readers = Vec::new();
        for index in 0..8 {
            let reconciler = reconciler.clone();
            readers.push(tokio::spawn(async move {
                reconciler
                    .resolve(RecordQuery::Authoritative, &format!("corr-{index}"))
                    .await
                    .expect("resolution")
            }));
        }

        let mut ids = Vec::new();
        for reader in readers {
            ids.push(reader.await.expect("reader task").record.id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn latest_persisted_record_wins() {
        let repo = Arc::new(InMemoryRecordRepository::default());
        let now = Utc::now();
        let older = RecordSubmission { total: Some(900.0), ..RecordSubmission::default() }
            .into_record(now - Duration::days(2))
            .expect("older");
        let newer = RecordSubmission { total: Some(320.0), ..RecordSubmission::default() }
            .into_record(now)
            .expect("newer");
        repo.insert(older).await.expect("insert older");
        repo.insert(newer.clone()).await.expect("insert newer");

        let resolution = reconciler(repo, ScriptedEngine::default(), true)
            .resolve(RecordQuery::Authoritative, "corr-3")
            .await
            .expect("resolution");

        assert_eq!(resolution.source, ResolutionSource::Persisted);
        assert_eq!(resolution.record, newer);
    }

    #[tokio::test]
    async fn legacy_document_without_total_is_treated_as_absent() {
        let repo = Arc::new(InMemoryRecordRepository::default());
        repo.push_document(RecordDocument {
            id: RecordId("REC-legacy".to_string()),
            generated_at: Utc::now(),
            period: Period::Weekly,
            total: None,
            breakdown: RecordBreakdown::default(),
            score: 0.0,
            origin: RecordOrigin::Submitted,
        })
        .await;

        let resolution = reconciler(repo.clone(), ScriptedEngine::default(), true)
            .resolve(RecordQuery::Authoritative, "corr-4")
            .await
            .expect("resolution");

        assert_eq!(resolution.source, ResolutionSource::Synthesized);
        assert_eq!(resolution.record.total, 4500.0);
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn disabled_synthesis_reports_not_found() {
        let repo = Arc::new(InMemoryRecordRepository::default());

        let error = reconciler(repo.clone(), ScriptedEngine::default(), false)
            .resolve(RecordQuery::Authoritative, "corr-5")
            .await
            .expect_err("not found");

        assert!(matches!(error, ApplicationError::NotFound(_)));
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn what_if_estimate_is_simulated_and_not_persisted() {
        let repo = Arc::new(InMemoryRecordRepository::default());
        let engine = ScriptedEngine::default().respond(
            "carbon_simulate",
            json!({
                "total_footprint": 8500,
                "score": 51,
                "breakdown": [
                    { "name": "Transport", "value": 3500 },
                    { "name": "Energy", "value": 3000 },
                    { "name": "Diet", "value": 2000 }
                ]
            }),
        );

        let resolution = reconciler(repo.clone(), engine, true)
            .resolve(RecordQuery::WhatIf(CarbonScenario::default()), "corr-6")
            .await
            .expect("estimate");

        assert_eq!(resolution.source, ResolutionSource::Simulated);
        assert_eq!(resolution.record.total, 8500.0);
        assert_eq!(resolution.record.breakdown.mobility, 3500.0);
        assert_eq!(resolution.record.score, 51.0);
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn what_if_engine_failure_is_a_simulation_error() {
        let repo = Arc::new(InMemoryRecordRepository::default());
        let engine = ScriptedEngine::default().fail(
            "carbon_simulate",
            EngineError::ComputationFailed { exit_code: Some(1), diagnostics: "boom".to_string() },
        );

        let error = reconciler(repo, engine, true)
            .resolve(RecordQuery::WhatIf(CarbonScenario::default()), "corr-7")
            .await
            .expect_err("failure");

        assert!(matches!(
            error,
            ApplicationError::Simulation { kind: FailureKind::ComputationFailed, .. }
        ));
    }
}
