use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::scenario::Domain;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    High,
    Medium,
    Low,
}

/// One actionable sustainability suggestion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub title: String,
    #[serde(default, alias = "description", alias = "message")]
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_impact")]
    pub impact: Option<Impact>,
    #[serde(default, alias = "savings", skip_serializing_if = "Option::is_none")]
    pub estimated_savings: Option<String>,
}

impl Suggestion {
    pub fn new(title: &str, detail: &str, impact: Impact, estimated_savings: Option<&str>) -> Self {
        Self {
            title: title.to_string(),
            detail: detail.to_string(),
            impact: Some(impact),
            estimated_savings: estimated_savings.map(str::to_string),
        }
    }
}

/// What the caller knows about the user's situation, used to build the prompt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuggestionContext {
    pub domain: Domain,
    #[serde(default)]
    pub facts: BTreeMap<String, Value>,
}

impl SuggestionContext {
    pub fn new(domain: Domain) -> Self {
        Self { domain, facts: BTreeMap::new() }
    }

    pub fn with_fact(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.facts.insert(key.into(), value.into());
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    Remote,
    Fallback,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionOutcome {
    pub suggestions: Vec<Suggestion>,
    pub source: SuggestionSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_version: Option<u32>,
}

fn lenient_impact<'de, D>(deserializer: D) -> Result<Option<Impact>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match value.trim().to_ascii_lowercase().as_str() {
        "high" => Some(Impact::High),
        "medium" => Some(Impact::Medium),
        "low" => Some(Impact::Low),
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn suggestion_accepts_free_form_impact_and_aliases() {
        let suggestion: Suggestion = serde_json::from_value(json!({
            "title": "Switch to EV commuting",
            "description": "Replace petrol trips with an EV.",
            "impact": "High",
            "savings": "1.2t"
        }))
        .expect("deserialize");

        assert_eq!(suggestion.impact, Some(Impact::High));
        assert_eq!(suggestion.detail, "Replace petrol trips with an EV.");
        assert_eq!(suggestion.estimated_savings.as_deref(), Some("1.2t"));
    }

    #[test]
    fn unknown_impact_is_dropped() {
        let suggestion: Suggestion =
            serde_json::from_value(json!({ "title": "Walk more", "impact": "enormous" }))
                .expect("deserialize");
        assert_eq!(suggestion.impact, None);
    }
}
