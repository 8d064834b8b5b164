pub mod config;
pub mod domain;
pub mod errors;
pub mod normalize;
pub mod select;

pub use domain::activity::{EnergyReading, MobilityTrip, NewEnergyReading, NewMobilityTrip};
pub use domain::comparison::{
    AlternativeOutcome, BestOption, ComparisonEntry, ComparisonSet, FailureKind,
};
pub use domain::record::{
    CanonicalRecord, CarbonLogEntry, Period, RecordBreakdown, RecordDocument, RecordId,
    RecordOrigin, RecordSubmission,
};
pub use domain::scenario::{
    AlternativeId, BreakdownEntry, Domain, EngineRequest, OptimizationHint, OptimizationRequest,
    ScenarioPayload, ScenarioRequest, ScenarioResult, TransportMode,
};
pub use domain::suggestion::{
    Impact, Suggestion, SuggestionContext, SuggestionOutcome, SuggestionSource,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use normalize::{normalize, NormalizeError};
pub use select::select_best;
