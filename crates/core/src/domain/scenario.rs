use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller-chosen identifier of one alternative inside a comparison.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlternativeId(pub String);

impl AlternativeId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlternativeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Energy,
    Mobility,
    Carbon,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Energy => "energy",
            Self::Mobility => "mobility",
            Self::Carbon => "carbon",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "energy" => Some(Self::Energy),
            "mobility" => Some(Self::Mobility),
            "carbon" => Some(Self::Carbon),
            _ => None,
        }
    }

    /// Unit every normalized result of this domain is expressed in.
    pub fn unit(&self) -> &'static str {
        match self {
            Self::Energy => "kWh",
            Self::Mobility => "kg CO2",
            Self::Carbon => "kg CO2e",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Car,
    Ev,
    Metro,
    Bus,
    Shared,
}

impl TransportMode {
    pub const COMPARISON_DEFAULTS: [TransportMode; 4] =
        [TransportMode::Car, TransportMode::Ev, TransportMode::Metro, TransportMode::Bus];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Ev => "ev",
            Self::Metro => "metro",
            Self::Bus => "bus",
            Self::Shared => "shared",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "car" => Some(Self::Car),
            "ev" => Some(Self::Ev),
            "metro" => Some(Self::Metro),
            "bus" => Some(Self::Bus),
            "shared" => Some(Self::Shared),
            _ => None,
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnergyScenario {
    #[serde(default = "default_building_type")]
    pub building_type: String,
    /// Operating hours per day.
    #[serde(default = "default_operating_hours")]
    pub hours: u32,
    /// Lighting intensity in percent.
    #[serde(default = "default_lighting")]
    pub lighting: u32,
}

impl Default for EnergyScenario {
    fn default() -> Self {
        Self {
            building_type: default_building_type(),
            hours: default_operating_hours(),
            lighting: default_lighting(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MobilityScenario {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    pub mode: TransportMode,
    #[serde(default, rename = "distance", alias = "distance_km", skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CarbonScenario {
    #[serde(default = "default_transport")]
    pub transport: String,
    #[serde(default = "default_energy_source")]
    pub energy: String,
    #[serde(default = "default_diet")]
    pub diet: String,
}

impl Default for CarbonScenario {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            energy: default_energy_source(),
            diet: default_diet(),
        }
    }
}

/// Domain-specific parameters of one scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "snake_case")]
pub enum ScenarioPayload {
    Energy(EnergyScenario),
    Mobility(MobilityScenario),
    Carbon(CarbonScenario),
}

impl ScenarioPayload {
    pub fn domain(&self) -> Domain {
        match self {
            Self::Energy(_) => Domain::Energy,
            Self::Mobility(_) => Domain::Mobility,
            Self::Carbon(_) => Domain::Carbon,
        }
    }

    /// Engine discriminator selecting the computation for this payload.
    pub fn engine_type(&self) -> &'static str {
        match self {
            Self::Energy(_) => "energy_simulate",
            Self::Mobility(_) => "mobility",
            Self::Carbon(_) => "carbon_simulate",
        }
    }
}

/// One alternative to evaluate. Immutable once handed to the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRequest {
    pub alternative_id: AlternativeId,
    #[serde(flatten)]
    pub payload: ScenarioPayload,
}

impl ScenarioRequest {
    pub fn new(alternative_id: impl Into<String>, payload: ScenarioPayload) -> Self {
        Self { alternative_id: AlternativeId::new(alternative_id), payload }
    }

    pub fn domain(&self) -> Domain {
        self.payload.domain()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    #[serde(default = "default_consumption")]
    pub consumption: f64,
    #[serde(default = "default_hour")]
    pub hour: u32,
}

impl Default for OptimizationRequest {
    fn default() -> Self {
        Self { consumption: default_consumption(), hour: default_hour() }
    }
}

/// Everything the scenario engine can be asked to compute.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineRequest {
    Simulate(ScenarioRequest),
    OptimizeEnergy(OptimizationRequest),
}

impl EngineRequest {
    pub fn engine_type(&self) -> &'static str {
        match self {
            Self::Simulate(request) => request.payload.engine_type(),
            Self::OptimizeEnergy(_) => "energy_optimize",
        }
    }

    /// Builds the single JSON object written to the engine's standard input.
    pub fn to_wire(&self) -> Result<Value, serde_json::Error> {
        let parameters = match self {
            Self::Simulate(request) => match &request.payload {
                ScenarioPayload::Energy(params) => serde_json::to_value(params)?,
                ScenarioPayload::Mobility(params) => serde_json::to_value(params)?,
                ScenarioPayload::Carbon(params) => serde_json::to_value(params)?,
            },
            Self::OptimizeEnergy(params) => serde_json::to_value(params)?,
        };

        let mut object = match parameters {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        object.insert("type".to_string(), Value::String(self.engine_type().to_string()));
        Ok(Value::Object(object))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub category: String,
    pub value: f64,
}

impl BreakdownEntry {
    pub fn new(category: impl Into<String>, value: f64) -> Self {
        Self { category: category.into(), value }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HourlyUsage {
    pub time: String,
    pub usage: f64,
    #[serde(default)]
    pub solar: f64,
}

/// Auxiliary per-domain figures carried next to the canonical total.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "snake_case")]
pub enum ResultDetails {
    Energy {
        hourly: Vec<HourlyUsage>,
        peak_warning: Option<bool>,
        solar_potential: Option<f64>,
    },
    Mobility {
        time_minutes: Option<f64>,
        cost: Option<f64>,
        distance_km: Option<f64>,
        saved_vs_car: Option<f64>,
    },
    Carbon {
        score: Option<f64>,
    },
}

/// Canonical, domain-independent outcome of one scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub alternative_id: AlternativeId,
    pub total: f64,
    pub breakdown: Vec<BreakdownEntry>,
    pub unit: String,
    pub details: ResultDetails,
}

/// Relative tolerance allowed between a result total and its breakdown sum.
pub const BREAKDOWN_TOLERANCE: f64 = 0.01;

impl ScenarioResult {
    pub fn breakdown_sum(&self) -> f64 {
        self.breakdown.iter().map(|entry| entry.value).sum()
    }

    pub fn is_consistent(&self) -> bool {
        self.total >= 0.0
            && (self.breakdown_sum() - self.total).abs()
                <= BREAKDOWN_TOLERANCE * self.total.max(1.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintKind {
    Warning,
    Success,
    Info,
}

/// Optimisation hint returned by the engine's `energy_optimize` computation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationHint {
    #[serde(rename = "type")]
    pub kind: HintKind,
    pub message: String,
}

fn default_building_type() -> String {
    "office".to_string()
}

fn default_operating_hours() -> u32 {
    10
}

fn default_lighting() -> u32 {
    80
}

fn default_transport() -> String {
    "car".to_string()
}

fn default_energy_source() -> String {
    "grid".to_string()
}

fn default_diet() -> String {
    "average".to_string()
}

fn default_consumption() -> f64 {
    600.0
}

fn default_hour() -> u32 {
    14
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn wire_payload_carries_type_discriminator() {
        let request = EngineRequest::Simulate(ScenarioRequest::new(
            "ev",
            ScenarioPayload::Mobility(MobilityScenario {
                start: Some("Central Station".to_string()),
                end: Some("Tech Park".to_string()),
                mode: TransportMode::Ev,
                distance_km: None,
            }),
        ));

        let wire = request.to_wire().expect("wire payload");
        assert_eq!(
            wire,
            json!({
                "type": "mobility",
                "start": "Central Station",
                "end": "Tech Park",
                "mode": "ev",
            })
        );
    }

    #[test]
    fn optimize_request_uses_energy_optimize_type() {
        let wire = EngineRequest::OptimizeEnergy(OptimizationRequest { consumption: 720.0, hour: 11 })
            .to_wire()
            .expect("wire payload");
        assert_eq!(wire["type"], "energy_optimize");
        assert_eq!(wire["consumption"], 720.0);
        assert_eq!(wire["hour"], 11);
    }

    #[test]
    fn scenario_request_deserializes_with_domain_tag() {
        let request: ScenarioRequest = serde_json::from_value(json!({
            "alternative_id": "solar-home",
            "domain": "carbon",
            "energy": "solar"
        }))
        .expect("deserialize");

        assert_eq!(request.alternative_id, AlternativeId::new("solar-home"));
        assert_eq!(request.domain(), Domain::Carbon);
        assert_eq!(
            request.payload,
            ScenarioPayload::Carbon(CarbonScenario {
                energy: "solar".to_string(),
                ..CarbonScenario::default()
            })
        );
    }

    #[test]
    fn consistency_check_uses_relative_tolerance() {
        let mut result = ScenarioResult {
            alternative_id: AlternativeId::new("a"),
            total: 1000.0,
            breakdown: vec![BreakdownEntry::new("x", 600.0), BreakdownEntry::new("y", 395.0)],
            unit: "kWh".to_string(),
            details: ResultDetails::Carbon { score: None },
        };
        assert!(result.is_consistent());

        result.breakdown[1].value = 380.0;
        assert!(!result.is_consistent());
    }
}
