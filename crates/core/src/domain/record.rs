use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::scenario::ScenarioResult;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn generate() -> Self {
        Self(format!("REC-{}", Uuid::new_v4()))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Daily,
    #[default]
    Weekly,
    Monthly,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOrigin {
    Submitted,
    Synthesized,
    Simulated,
}

impl RecordOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Synthesized => "synthesized",
            Self::Simulated => "simulated",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "submitted" => Some(Self::Submitted),
            "synthesized" => Some(Self::Synthesized),
            "simulated" => Some(Self::Simulated),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordBreakdown {
    #[serde(default)]
    pub mobility: f64,
    #[serde(default)]
    pub energy: f64,
    #[serde(default)]
    pub other: f64,
}

impl RecordBreakdown {
    pub fn sum(&self) -> f64 {
        self.mobility + self.energy + self.other
    }
}

/// Authoritative sustainability snapshot. Written whole, never mutated in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: RecordId,
    pub generated_at: DateTime<Utc>,
    pub period: Period,
    pub total: f64,
    pub breakdown: RecordBreakdown,
    pub score: f64,
    pub origin: RecordOrigin,
}

pub const DEFAULT_RECORD_TOTAL: f64 = 4500.0;
pub const DEFAULT_RECORD_SCORE: f64 = 65.0;
pub const DEFAULT_RECORD_BREAKDOWN: RecordBreakdown =
    RecordBreakdown { mobility: 1500.0, energy: 2000.0, other: 1000.0 };

/// Divisor of the logged-footprint score: every 50 kg costs one point.
const SCORE_KG_PER_POINT: f64 = 50.0;

/// Sustainability score for a logged footprint, `round(max(0, 100 - total / 50))`.
pub fn score_for_total(total: f64) -> f64 {
    (100.0 - total / SCORE_KG_PER_POINT).max(0.0).min(100.0).round()
}

impl CanonicalRecord {
    /// Neutral starting state used when nothing has been persisted yet.
    pub fn synthesized_default(now: DateTime<Utc>) -> Self {
        Self {
            id: RecordId::generate(),
            generated_at: now,
            period: Period::Monthly,
            total: DEFAULT_RECORD_TOTAL,
            breakdown: DEFAULT_RECORD_BREAKDOWN,
            score: DEFAULT_RECORD_SCORE,
            origin: RecordOrigin::Synthesized,
        }
    }

    /// Shapes a carbon simulation into an unpersisted what-if record.
    pub fn estimate_from(result: &ScenarioResult, now: DateTime<Utc>) -> Self {
        let mut breakdown = RecordBreakdown::default();
        for entry in &result.breakdown {
            match entry.category.trim().to_ascii_lowercase().as_str() {
                "transport" | "mobility" => breakdown.mobility += entry.value,
                "energy" => breakdown.energy += entry.value,
                _ => breakdown.other += entry.value,
            }
        }

        let score = match &result.details {
            crate::domain::scenario::ResultDetails::Carbon { score: Some(score) } => {
                score.clamp(0.0, 100.0)
            }
            _ => score_for_total(result.total),
        };

        Self {
            id: RecordId(format!("EST-{}", result.alternative_id)),
            generated_at: now,
            period: Period::Monthly,
            total: result.total,
            breakdown,
            score,
            origin: RecordOrigin::Simulated,
        }
    }
}

/// Record document as stored. Legacy documents may lack a total.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordDocument {
    pub id: RecordId,
    pub generated_at: DateTime<Utc>,
    pub period: Period,
    pub total: Option<f64>,
    pub breakdown: RecordBreakdown,
    pub score: f64,
    pub origin: RecordOrigin,
}

impl RecordDocument {
    /// Usable only when the primary numeric field is present and finite.
    pub fn into_canonical(self) -> Option<CanonicalRecord> {
        let total = self.total.filter(|total| total.is_finite())?;
        Some(CanonicalRecord {
            id: self.id,
            generated_at: self.generated_at,
            period: self.period,
            total,
            breakdown: self.breakdown,
            score: self.score,
            origin: self.origin,
        })
    }
}

impl From<CanonicalRecord> for RecordDocument {
    fn from(value: CanonicalRecord) -> Self {
        Self {
            id: value.id,
            generated_at: value.generated_at,
            period: value.period,
            total: Some(value.total),
            breakdown: value.breakdown,
            score: value.score,
            origin: value.origin,
        }
    }
}

/// Full record submitted by a client.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RecordSubmission {
    #[serde(default, alias = "totalCarbonFootprint")]
    pub total: Option<f64>,
    #[serde(default)]
    pub breakdown: Option<RecordBreakdown>,
    #[serde(default, alias = "sustainabilityScore")]
    pub score: Option<f64>,
    #[serde(default)]
    pub period: Option<Period>,
}

impl RecordSubmission {
    pub fn into_record(self, now: DateTime<Utc>) -> Result<CanonicalRecord, DomainError> {
        let total = self
            .total
            .ok_or_else(|| DomainError::Validation("total is required".to_string()))?;
        ensure_amount("total", total)?;

        let breakdown = self.breakdown.unwrap_or_default();
        ensure_amount("breakdown.mobility", breakdown.mobility)?;
        ensure_amount("breakdown.energy", breakdown.energy)?;
        ensure_amount("breakdown.other", breakdown.other)?;

        let score = match self.score {
            Some(score) if !(0.0..=100.0).contains(&score) => {
                return Err(DomainError::Validation(format!(
                    "score must be within 0..=100, got {score}"
                )))
            }
            Some(score) => score,
            None => score_for_total(total),
        };

        Ok(CanonicalRecord {
            id: RecordId::generate(),
            generated_at: now,
            period: self.period.unwrap_or_default(),
            total,
            breakdown,
            score,
            origin: RecordOrigin::Submitted,
        })
    }
}

/// Raw per-category figures logged by a user; diet lands in `other`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CarbonLogEntry {
    pub mobility: f64,
    pub energy: f64,
    pub diet: f64,
    #[serde(default = "default_log_period")]
    pub period: Period,
}

impl CarbonLogEntry {
    pub fn into_record(self, now: DateTime<Utc>) -> Result<CanonicalRecord, DomainError> {
        ensure_amount("mobility", self.mobility)?;
        ensure_amount("energy", self.energy)?;
        ensure_amount("diet", self.diet)?;

        let total = self.mobility + self.energy + self.diet;
        ensure_amount("total", total)?;
        Ok(CanonicalRecord {
            id: RecordId::generate(),
            generated_at: now,
            period: self.period,
            total,
            breakdown: RecordBreakdown {
                mobility: self.mobility,
                energy: self.energy,
                other: self.diet,
            },
            score: score_for_total(total),
            origin: RecordOrigin::Submitted,
        })
    }
}

fn default_log_period() -> Period {
    Period::Daily
}

fn ensure_amount(field: &str, value: f64) -> Result<(), DomainError> {
    if !value.is_finite() {
        return Err(DomainError::Validation(format!("{field} must be a finite number")));
    }
    if value < 0.0 {
        return Err(DomainError::Validation(format!("{field} must not be negative")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::domain::scenario::{AlternativeId, BreakdownEntry, ResultDetails};

    #[test]
    fn carbon_log_entry_derives_total_and_score() {
        let entry: CarbonLogEntry =
            serde_json::from_value(json!({ "mobility": 100, "energy": 50, "diet": 20 }))
                .expect("deserialize");
        let record = entry.into_record(Utc::now()).expect("valid entry");

        assert_eq!(record.total, 170.0);
        assert_eq!(record.score, 97.0);
        assert_eq!(record.breakdown.other, 20.0);
        assert_eq!(record.period, Period::Daily);
        assert_eq!(record.origin, RecordOrigin::Submitted);
    }

    #[test]
    fn carbon_log_entry_rejects_an_overflowing_total() {
        let entry = CarbonLogEntry {
            mobility: 1e308,
            energy: 1e308,
            diet: 0.0,
            period: Period::Daily,
        };

        let error = entry.into_record(Utc::now()).expect_err("overflowing total");

        assert_eq!(error, DomainError::Validation("total must be a finite number".to_string()));
    }

    #[test]
    fn score_never_drops_below_zero() {
        assert_eq!(score_for_total(9_000.0), 0.0);
        assert_eq!(score_for_total(0.0), 100.0);
    }

    #[test]
    fn submission_without_total_is_rejected() {
        let submission: RecordSubmission = serde_json::from_value(json!({
            "breakdown": { "mobility": 10 },
            "period": "weekly"
        }))
        .expect("deserialize");

        let error = submission.into_record(Utc::now()).expect_err("missing total");
        assert!(matches!(error, DomainError::Validation(ref message) if message.contains("total")));
    }

    #[test]
    fn submission_accepts_legacy_field_names() {
        let submission: RecordSubmission = serde_json::from_value(json!({
            "totalCarbonFootprint": 320.5,
            "sustainabilityScore": 88,
            "period": "monthly"
        }))
        .expect("deserialize");

        let record = submission.into_record(Utc::now()).expect("valid submission");
        assert_eq!(record.total, 320.5);
        assert_eq!(record.score, 88.0);
        assert_eq!(record.period, Period::Monthly);
    }

    #[test]
    fn submission_rejects_out_of_range_score() {
        let submission = RecordSubmission {
            total: Some(10.0),
            score: Some(140.0),
            ..RecordSubmission::default()
        };
        assert!(submission.into_record(Utc::now()).is_err());
    }

    #[test]
    fn legacy_document_without_total_is_not_usable() {
        let document = RecordDocument {
            id: RecordId("REC-legacy".to_string()),
            generated_at: Utc::now(),
            period: Period::Weekly,
            total: None,
            breakdown: RecordBreakdown::default(),
            score: 0.0,
            origin: RecordOrigin::Submitted,
        };
        assert!(document.into_canonical().is_none());
    }

    #[test]
    fn default_record_matches_seed_values() {
        let record = CanonicalRecord::synthesized_default(Utc::now());
        assert_eq!(record.total, 4500.0);
        assert_eq!(record.score, 65.0);
        assert_eq!(record.breakdown.sum(), record.total);
        assert_eq!(record.period, Period::Monthly);
    }

    #[test]
    fn estimate_maps_transport_category_to_mobility() {
        let result = ScenarioResult {
            alternative_id: AlternativeId::new("what-if"),
            total: 8500.0,
            breakdown: vec![
                BreakdownEntry::new("Transport", 3500.0),
                BreakdownEntry::new("Energy", 3000.0),
                BreakdownEntry::new("Diet", 1000.0),
                BreakdownEntry::new("Other", 1000.0),
            ],
            unit: "kg CO2e".to_string(),
            details: ResultDetails::Carbon { score: Some(51.0) },
        };

        let record = CanonicalRecord::estimate_from(&result, Utc::now());
        assert_eq!(record.breakdown.mobility, 3500.0);
        assert_eq!(record.breakdown.energy, 3000.0);
        assert_eq!(record.breakdown.other, 2000.0);
        assert_eq!(record.score, 51.0);
        assert_eq!(record.origin, RecordOrigin::Simulated);
    }
}
