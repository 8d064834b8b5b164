use std::sync::Arc;

use ecosim_core::domain::scenario::{
    EngineRequest, OptimizationHint, OptimizationRequest, ScenarioRequest, ScenarioResult,
};
use ecosim_core::normalize::{normalize, optimization_hints, NormalizeError};
use tracing::warn;

use crate::adapter::{EngineError, ScenarioEngine};

/// One engine run followed by normalization into a [`ScenarioResult`].
#[derive(Clone)]
pub struct ScenarioSimulator {
    engine: Arc<dyn ScenarioEngine>,
}

impl ScenarioSimulator {
    pub fn new(engine: Arc<dyn ScenarioEngine>) -> Self {
        Self { engine }
    }

    pub async fn simulate(
        &self,
        request: &ScenarioRequest,
        correlation_id: &str,
    ) -> Result<ScenarioResult, EngineError> {
        let raw = self.engine.invoke(&EngineRequest::Simulate(request.clone()), correlation_id).await?;

        normalize(request.domain(), &request.alternative_id, &raw).map_err(|error| {
            log_rejected_output(correlation_id, request.payload.engine_type(), &error);
            EngineError::MalformedOutput(error.to_string())
        })
    }

    pub async fn optimize_energy(
        &self,
        request: &OptimizationRequest,
        correlation_id: &str,
    ) -> Result<Vec<OptimizationHint>, EngineError> {
        let raw = self
            .engine
            .invoke(&EngineRequest::OptimizeEnergy(request.clone()), correlation_id)
            .await?;

        optimization_hints(&raw).map_err(|error| {
            log_rejected_output(correlation_id, "energy_optimize", &error);
            EngineError::MalformedOutput(error.to_string())
        })
    }
}

fn log_rejected_output(correlation_id: &str, engine_type: &str, error: &NormalizeError) {
    warn!(
        event_name = "engine.normalize.rejected",
        correlation_id,
        engine_type,
        error = %error,
        "engine output could not be normalized"
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ecosim_core::domain::scenario::{
        CarbonScenario, Domain, HintKind, OptimizationRequest, ScenarioPayload, ScenarioRequest,
    };
    use serde_json::json;

    use crate::adapter::EngineError;
    use crate::testing::ScriptedEngine;

    use super::ScenarioSimulator;

    #[tokio::test]
    async fn carbon_simulation_is_normalized() {
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
        let simulator = ScenarioSimulator::new(Arc::new(engine));

        let result = simulator
            .simulate(
                &ScenarioRequest::new("baseline", ScenarioPayload::Carbon(CarbonScenario::default())),
                "corr-1",
            )
            .await
            .expect("simulation");

        assert_eq!(result.total, 8500.0);
        assert_eq!(result.unit, Domain::Carbon.unit());
        assert!(result.is_consistent());
    }

    #[tokio::test]
    async fn engine_reported_error_becomes_malformed_output() {
        let engine = ScriptedEngine::default()
            .respond("carbon_simulate", json!({ "error": "unsupported diet" }));
        let simulator = ScenarioSimulator::new(Arc::new(engine));

        let error = simulator
            .simulate(
                &ScenarioRequest::new("x", ScenarioPayload::Carbon(CarbonScenario::default())),
                "corr-2",
            )
            .await
            .expect_err("engine error");
        assert!(matches!(error, EngineError::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn optimization_returns_hints() {
        let engine = ScriptedEngine::default().respond(
            "energy_optimize",
            json!({ "suggestions": [{ "type": "warning", "message": "High peak usage detected." }] }),
        );
        let simulator = ScenarioSimulator::new(Arc::new(engine));

        let hints = simulator
            .optimize_energy(&OptimizationRequest { consumption: 720.0, hour: 18 }, "corr-3")
            .await
            .expect("hints");
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].kind, HintKind::Warning);
    }
}
