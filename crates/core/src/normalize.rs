//! Result normalization.
//!
//! Maps the domain-specific output of the scenario engine into the canonical
//! [`ScenarioResult`] shape. Every result produced here satisfies the
//! breakdown invariant: the breakdown sums to the total within
//! [`BREAKDOWN_TOLERANCE`], and the total is never negative.
//!
//! The engine is lenient about number formatting (mobility figures arrive as
//! `"3.2 kg"`, `"$6.50"`, `"35 min"`), so every numeric field accepts either a
//! JSON number or a unit-suffixed string.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::scenario::{
    AlternativeId, BreakdownEntry, Domain, HintKind, HourlyUsage, OptimizationHint, ResultDetails,
    ScenarioResult, BREAKDOWN_TOLERANCE,
};

pub const UNSPECIFIED_CATEGORY: &str = "Unspecified";
pub const UNATTRIBUTED_CATEGORY: &str = "Unattributed";
const ENERGY_USAGE_CATEGORY: &str = "Usage";
const MOBILITY_EMISSIONS_CATEGORY: &str = "Emissions";

#[derive(Clone, Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("engine output is not a JSON object")]
    NotAnObject,
    #[error("engine reported an error: {0}")]
    EngineReported(String),
    #[error("engine output carries neither a total nor a breakdown")]
    MissingTotal,
}

pub fn normalize(
    domain: Domain,
    alternative_id: &AlternativeId,
    raw: &Value,
) -> Result<ScenarioResult, NormalizeError> {
    let object = raw.as_object().ok_or(NormalizeError::NotAnObject)?;
    if let Some(message) = object.get("error") {
        let message = message.as_str().map(str::to_string).unwrap_or_else(|| message.to_string());
        return Err(NormalizeError::EngineReported(message));
    }

    let (total, breakdown, details) = match domain {
        Domain::Energy => energy_fields(object),
        Domain::Mobility => mobility_fields(object),
        Domain::Carbon => carbon_fields(object),
    };
    let (total, breakdown) = balance(total, breakdown)?;

    Ok(ScenarioResult {
        alternative_id: alternative_id.clone(),
        total,
        breakdown,
        unit: domain.unit().to_string(),
        details,
    })
}

/// Parses the `{suggestions: [{type, message}]}` reply of an optimisation run.
pub fn optimization_hints(raw: &Value) -> Result<Vec<OptimizationHint>, NormalizeError> {
    let object = raw.as_object().ok_or(NormalizeError::NotAnObject)?;
    if let Some(message) = object.get("error") {
        return Err(NormalizeError::EngineReported(message.to_string()));
    }

    let Some(items) = object.get("suggestions").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    Ok(items
        .iter()
        .filter_map(|item| {
            let message = item.get("message")?.as_str()?.trim().to_string();
            let kind = match item.get("type").and_then(Value::as_str).map(str::trim) {
                Some("warning") => HintKind::Warning,
                Some("success") => HintKind::Success,
                _ => HintKind::Info,
            };
            (!message.is_empty()).then_some(OptimizationHint { kind, message })
        })
        .collect())
}

fn energy_fields(raw: &Map<String, Value>) -> (Option<f64>, Vec<BreakdownEntry>, ResultDetails) {
    let hourly: Vec<HourlyUsage> = first_present(raw, &["hourly_usage", "usage_profile"])
        .and_then(Value::as_array)
        .map(|series| {
            series
                .iter()
                .enumerate()
                .filter_map(|(index, point)| {
                    let usage = point.get("usage").and_then(parse_amount)?;
                    let time = point
                        .get("time")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("{index:02}:00"));
                    let solar = point.get("solar").and_then(parse_amount).unwrap_or(0.0);
                    Some(HourlyUsage { time, usage, solar })
                })
                .collect()
        })
        .unwrap_or_default();

    let series_total =
        (!hourly.is_empty()).then(|| hourly.iter().map(|point| point.usage).sum::<f64>());
    let total = series_total.or_else(|| number_field(raw, &["total", "total_daily_kwh"]));

    let mut breakdown = first_present(raw, &["categories", "devices"])
        .map(parse_breakdown)
        .unwrap_or_default();
    if breakdown.is_empty() {
        if let Some(total) = total {
            breakdown.push(BreakdownEntry::new(ENERGY_USAGE_CATEGORY, total));
        }
    }

    let details = ResultDetails::Energy {
        hourly,
        peak_warning: raw.get("peak_warning").and_then(Value::as_bool),
        solar_potential: number_field(raw, &["solar_potential"]),
    };
    (total, breakdown, details)
}

fn mobility_fields(raw: &Map<String, Value>) -> (Option<f64>, Vec<BreakdownEntry>, ResultDetails) {
    let total = number_field(raw, &["co2", "co2_kg", "total"]);

    let mut breakdown = raw.get("breakdown").map(parse_breakdown).unwrap_or_default();
    if breakdown.is_empty() {
        if let Some(co2) = total {
            breakdown.push(BreakdownEntry::new(MOBILITY_EMISSIONS_CATEGORY, co2));
        }
    }

    let details = ResultDetails::Mobility {
        time_minutes: number_field(raw, &["time", "time_minutes", "duration_minutes"]),
        cost: number_field(raw, &["cost"]),
        distance_km: number_field(raw, &["distance", "distance_km"]),
        saved_vs_car: number_field(raw, &["saved_vs_car"]),
    };
    (total, breakdown, details)
}

fn carbon_fields(raw: &Map<String, Value>) -> (Option<f64>, Vec<BreakdownEntry>, ResultDetails) {
    let breakdown = match raw.get("breakdown") {
        Some(value) => parse_breakdown(value),
        None => triplet(raw),
    };

    let details = ResultDetails::Carbon { score: number_field(raw, &["score"]) };
    (number_field(raw, &["total", "total_footprint"]), breakdown, details)
}

/// Reads the `{mobility, energy, other}` triplet in that order, plus any
/// further known categories the engine reports next to it.
fn triplet(raw: &Map<String, Value>) -> Vec<BreakdownEntry> {
    ["mobility", "energy", "diet", "other"]
        .iter()
        .filter_map(|key| {
            raw.get(*key).and_then(parse_amount).map(|value| BreakdownEntry::new(title_case(key), value))
        })
        .collect()
}

/// Enforces the breakdown invariant on whatever the engine supplied.
fn balance(
    total: Option<f64>,
    breakdown: Vec<BreakdownEntry>,
) -> Result<(f64, Vec<BreakdownEntry>), NormalizeError> {
    let mut breakdown: Vec<BreakdownEntry> = breakdown
        .into_iter()
        .filter(|entry| entry.value.is_finite())
        .map(|entry| BreakdownEntry { value: entry.value.max(0.0), ..entry })
        .collect();
    let total = total.filter(|value| value.is_finite()).map(|value| value.max(0.0));

    match (total, breakdown.is_empty()) {
        (None, true) => Err(NormalizeError::MissingTotal),
        (Some(total), true) => Ok((total, vec![BreakdownEntry::new(UNSPECIFIED_CATEGORY, total)])),
        (None, false) => {
            let sum = breakdown.iter().map(|entry| entry.value).sum();
            Ok((sum, breakdown))
        }
        (Some(total), false) => {
            let sum: f64 = breakdown.iter().map(|entry| entry.value).sum();
            if (sum - total).abs() <= BREAKDOWN_TOLERANCE * total.max(1.0) {
                Ok((total, breakdown))
            } else if total > sum {
                breakdown.push(BreakdownEntry::new(UNATTRIBUTED_CATEGORY, total - sum));
                Ok((total, breakdown))
            } else {
                // categories outweigh the reported total; the categories win
                Ok((sum, breakdown))
            }
        }
    }
}

fn parse_breakdown(value: &Value) -> Vec<BreakdownEntry> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let category = ["category", "name", "label"]
                    .iter()
                    .find_map(|key| item.get(*key).and_then(Value::as_str))?;
                let amount = ["value", "amount"].iter().find_map(|key| item.get(*key))?;
                parse_amount(amount).map(|value| BreakdownEntry::new(category, value))
            })
            .collect(),
        Value::Object(map) => {
            let ordered = triplet(map);
            if ordered.len() == map.len() {
                return ordered;
            }
            map.iter()
                .filter_map(|(key, amount)| {
                    parse_amount(amount).map(|value| BreakdownEntry::new(title_case(key), value))
                })
                .collect()
        }
        _ => Vec::new(),
    }
}

fn first_present<'a>(raw: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| raw.get(*key))
}

fn number_field(raw: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| raw.get(*key).and_then(parse_amount))
}

/// Accepts `3.2`, `"3.2"`, `"3.2 kg"`, `"$6.50"`, `"1,250 kWh"`.
pub fn parse_amount(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => {
            let trimmed = text.trim().trim_start_matches(['$', '€', '£']).trim_start();
            let numeric: String = trimmed
                .chars()
                .take_while(|ch| ch.is_ascii_digit() || matches!(ch, '.' | '-' | '+' | ','))
                .filter(|ch| *ch != ',')
                .collect();
            numeric.parse::<f64>().ok()?
        }
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn title_case(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
