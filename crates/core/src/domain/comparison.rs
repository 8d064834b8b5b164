use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::scenario::{AlternativeId, ScenarioResult};
use crate::errors::DomainError;

/// Why an alternative could not be computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ComputationFailed,
    MalformedOutput,
    Timeout,
    Unavailable,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ComputationFailed => "computation_failed",
            Self::MalformedOutput => "malformed_output",
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
        }
    }

    /// Stable message safe to show to end callers.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::ComputationFailed | Self::Unavailable => "Simulation failed",
            Self::MalformedOutput => "Invalid engine output",
            Self::Timeout => "Simulation timed out",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slot of one alternative in a comparison. Failures are kept as a
/// "not available" sentinel instead of aborting the comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AlternativeOutcome {
    Computed { result: ScenarioResult },
    NotAvailable { reason: FailureKind },
}

impl AlternativeOutcome {
    pub fn result(&self) -> Option<&ScenarioResult> {
        match self {
            Self::Computed { result } => Some(result),
            Self::NotAvailable { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub alternative_id: AlternativeId,
    #[serde(flatten)]
    pub outcome: AlternativeOutcome,
}

/// Results of one comparison keyed by alternative, in caller-declared order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSet {
    pub baseline_id: AlternativeId,
    pub results: Vec<ComparisonEntry>,
}

impl ComparisonSet {
    pub fn new(
        baseline_id: AlternativeId,
        results: Vec<ComparisonEntry>,
    ) -> Result<Self, DomainError> {
        validate_alternatives(&baseline_id, results.iter().map(|entry| &entry.alternative_id))?;
        Ok(Self { baseline_id, results })
    }

    pub fn get(&self, alternative_id: &AlternativeId) -> Option<&AlternativeOutcome> {
        self.results
            .iter()
            .find(|entry| &entry.alternative_id == alternative_id)
            .map(|entry| &entry.outcome)
    }

    pub fn baseline(&self) -> Option<&ScenarioResult> {
        self.get(&self.baseline_id).and_then(AlternativeOutcome::result)
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|entry| entry.outcome.result().is_none()).count()
    }
}

/// Checks that alternatives are non-empty, unique, and include the baseline.
pub fn validate_alternatives<'a>(
    baseline_id: &AlternativeId,
    alternatives: impl IntoIterator<Item = &'a AlternativeId>,
) -> Result<(), DomainError> {
    let mut seen = HashSet::new();
    for alternative in alternatives {
        if alternative.as_str().trim().is_empty() {
            return Err(DomainError::Validation("alternative_id must not be empty".to_string()));
        }
        if !seen.insert(alternative.clone()) {
            return Err(DomainError::Validation(format!(
                "duplicate alternative_id `{alternative}`"
            )));
        }
    }

    if seen.is_empty() {
        return Err(DomainError::Validation(
            "a comparison needs at least one alternative".to_string(),
        ));
    }
    if !seen.contains(baseline_id) {
        return Err(DomainError::Validation(format!(
            "baseline `{baseline_id}` is not one of the alternatives"
        )));
    }
    Ok(())
}

/// Winning alternative of a comparison, measured against the baseline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BestOption {
    pub alternative_id: AlternativeId,
    pub savings: f64,
    pub savings_ratio: f64,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::scenario::{BreakdownEntry, ResultDetails};

    fn computed(id: &str, total: f64) -> ComparisonEntry {
        ComparisonEntry {
            alternative_id: AlternativeId::new(id),
            outcome: AlternativeOutcome::Computed {
                result: ScenarioResult {
                    alternative_id: AlternativeId::new(id),
                    total,
                    breakdown: vec![BreakdownEntry::new("Emissions", total)],
                    unit: "kg CO2".to_string(),
                    details: ResultDetails::Mobility {
                        time_minutes: None,
                        cost: None,
                        distance_km: None,
                        saved_vs_car: None,
                    },
                },
            },
        }
    }

    #[test]
    fn baseline_must_be_declared() {
        let error = ComparisonSet::new(AlternativeId::new("car"), vec![computed("ev", 0.8)])
            .expect_err("baseline missing");
        assert!(matches!(error, DomainError::Validation(ref message) if message.contains("car")));
    }

    #[test]
    fn duplicate_alternatives_are_rejected() {
        let error = ComparisonSet::new(
            AlternativeId::new("car"),
            vec![computed("car", 3.2), computed("car", 3.1)],
        )
        .expect_err("duplicate");
        assert!(matches!(error, DomainError::Validation(ref message) if message.contains("duplicate")));
    }

    #[test]
    fn failed_slot_serializes_as_not_available_sentinel() {
        let entry = ComparisonEntry {
            alternative_id: AlternativeId::new("bus"),
            outcome: AlternativeOutcome::NotAvailable { reason: FailureKind::ComputationFailed },
        };

        let value = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(
            value,
            json!({
                "alternative_id": "bus",
                "status": "not_available",
                "reason": "computation_failed",
            })
        );
    }

    #[test]
    fn public_messages_do_not_depend_on_diagnostics() {
        assert_eq!(FailureKind::ComputationFailed.public_message(), "Simulation failed");
        assert_eq!(FailureKind::MalformedOutput.public_message(), "Invalid engine output");
        assert_eq!(FailureKind::Timeout.public_message(), "Simulation timed out");
    }
}
