//! Comparison Orchestrator.
//!
//! Fans one comparison out into one engine run per alternative and collects
//! the results by declared position, never by arrival order. A failing
//! alternative is recorded as "not available" and never aborts its siblings.
//! Dropping the returned future aborts every outstanding run, which in turn
//! kills the engine processes they own.

use ecosim_core::domain::comparison::{
    validate_alternatives, AlternativeOutcome, BestOption, ComparisonEntry, ComparisonSet,
    FailureKind,
};
use ecosim_core::domain::scenario::{AlternativeId, ScenarioRequest};
use ecosim_core::errors::DomainError;
use ecosim_core::select::select_best;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::simulator::ScenarioSimulator;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComparisonReport {
    #[serde(flatten)]
    pub comparison: ComparisonSet,
    pub best: Option<BestOption>,
}

#[derive(Clone)]
pub struct ComparisonOrchestrator {
    simulator: ScenarioSimulator,
}

impl ComparisonOrchestrator {
    pub fn new(simulator: ScenarioSimulator) -> Self {
        Self { simulator }
    }

    pub async fn compare(
        &self,
        baseline_id: AlternativeId,
        alternatives: Vec<ScenarioRequest>,
        correlation_id: &str,
    ) -> Result<ComparisonSet, DomainError> {
        validate_alternatives(&baseline_id, alternatives.iter().map(|request| &request.alternative_id))?;

        // a run that panics leaves its slot unavailable
        let mut slots = vec![
            AlternativeOutcome::NotAvailable { reason: FailureKind::Unavailable };
            alternatives.len()
        ];

        let mut runs = JoinSet::new();
        for (index, request) in alternatives.iter().cloned().enumerate() {
            let simulator = self.simulator.clone();
            let correlation_id = correlation_id.to_string();
            runs.spawn(async move {
                let outcome = match simulator.simulate(&request, &correlation_id).await {
                    Ok(result) => AlternativeOutcome::Computed { result },
                    Err(error) => {
                        info!(
                            event_name = "comparison.alternative.unavailable",
                            correlation_id = %correlation_id,
                            alternative_id = %request.alternative_id,
                            reason = %error.kind(),
                            "alternative marked not available"
                        );
                        AlternativeOutcome::NotAvailable { reason: error.kind() }
                    }
                };
                (index, outcome)
            });
        }

        while let Some(joined) = runs.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = outcome,
                Err(error) => warn!(
                    event_name = "comparison.alternative.aborted",
                    correlation_id,
                    error = %error,
                    "alternative run did not complete"
                ),
            }
        }

        let results = alternatives
            .into_iter()
            .zip(slots)
            .map(|(request, outcome)| ComparisonEntry { alternative_id: request.alternative_id, outcome })
            .collect();
        ComparisonSet::new(baseline_id, results)
    }

    pub async fn compare_and_select(
        &self,
        baseline_id: AlternativeId,
        alternatives: Vec<ScenarioRequest>,
        correlation_id: &str,
    ) -> Result<ComparisonReport, DomainError> {
        let comparison = self.compare(baseline_id, alternatives, correlation_id).await?;
        let best = select_best(&comparison);

        info!(
            event_name = "comparison.completed",
            correlation_id,
            alternatives = comparison.results.len(),
            failed = comparison.failed_count(),
            best = best.as_ref().map(|option| option.alternative_id.as_str()).unwrap_or("none"),
            "comparison completed"
        );
        Ok(ComparisonReport { comparison, best })
    }
}
