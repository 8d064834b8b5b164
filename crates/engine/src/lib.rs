//! Scenario engine integration: the process adapter, result normalization
//! glue, and the parallel comparison orchestrator.

pub mod adapter;
pub mod orchestrator;
pub mod simulator;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use adapter::{EngineError, ProcessEngine, ScenarioEngine};
pub use orchestrator::{ComparisonOrchestrator, ComparisonReport};
pub use simulator::ScenarioSimulator;
