use std::sync::Arc;
use std::time::Duration;

use ecosim_core::config::AdvisorConfig;
use ecosim_core::domain::scenario::Domain;
use ecosim_core::domain::suggestion::{
    Suggestion, SuggestionContext, SuggestionOutcome, SuggestionSource,
};
use tracing::{debug, info, warn};

use crate::breaker::CircuitBreaker;
use crate::catalog::{fallback_suggestions, FALLBACK_CATALOG_VERSION};
use crate::llm::{AdvisorError, HttpLlmClient, LlmClient};

const RESPONSE_FORMAT: &str = "Respond only with a JSON array of objects with the keys \
\"title\", \"description\", \"impact\" (High, Medium or Low) and \"savings\".";

/// Remote advice with a fixed per-domain fallback.
pub struct SuggestionStrategy {
    client: Option<Arc<dyn LlmClient>>,
    breaker: CircuitBreaker,
}

impl SuggestionStrategy {
    pub fn new(client: Arc<dyn LlmClient>, breaker: CircuitBreaker) -> Self {
        Self { client: Some(client), breaker }
    }

    /// Strategy that never calls out and always serves the catalog.
    pub fn fallback_only() -> Self {
        Self { client: None, breaker: CircuitBreaker::new(1, Duration::ZERO) }
    }

    pub fn from_config(config: &AdvisorConfig) -> Result<Self, AdvisorError> {
        if !config.enabled {
            return Ok(Self::fallback_only());
        }
        let client = HttpLlmClient::from_config(config)?;
        Ok(Self::new(
            Arc::new(client),
            CircuitBreaker::new(config.failure_threshold, Duration::from_secs(config.cooldown_secs)),
        ))
    }

    pub fn is_remote_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub async fn suggestions(
        &self,
        context: &SuggestionContext,
        correlation_id: &str,
    ) -> SuggestionOutcome {
        let Some(client) = &self.client else {
            debug!(
                event_name = "advisor.fallback.disabled",
                correlation_id,
                domain = %context.domain,
                "remote advisor disabled; serving fallback catalog"
            );
            return fallback(context.domain);
        };

        if !self.breaker.allows_request() {
            info!(
                event_name = "advisor.circuit.open",
                correlation_id,
                domain = %context.domain,
                "advisor circuit open; serving fallback catalog"
            );
            return fallback(context.domain);
        }

        let prompt = build_prompt(context);
        let result = match client.complete(&prompt).await {
            Ok(text) => extract_suggestions(&text),
            Err(error) => Err(error),
        };

        match result {
            Ok(suggestions) => {
                self.breaker.record_success();
                debug!(
                    event_name = "advisor.remote.completed",
                    correlation_id,
                    domain = %context.domain,
                    suggestions = suggestions.len(),
                    "remote suggestions received"
                );
                SuggestionOutcome { suggestions, source: SuggestionSource::Remote, catalog_version: None }
            }
            Err(error) => {
                self.breaker.record_failure();
                warn!(
                    event_name = "advisor.remote.failed",
                    correlation_id,
                    domain = %context.domain,
                    error = %error,
                    consecutive_failures = self.breaker.consecutive_failures(),
                    "remote advisor failed; serving fallback catalog"
                );
                fallback(context.domain)
            }
        }
    }
}

fn fallback(domain: Domain) -> SuggestionOutcome {
    SuggestionOutcome {
        suggestions: fallback_suggestions(domain),
        source: SuggestionSource::Fallback,
        catalog_version: Some(FALLBACK_CATALOG_VERSION),
    }
}

fn build_prompt(context: &SuggestionContext) -> String {
    let facts = serde_json::to_string(&context.facts).unwrap_or_else(|_| "{}".to_string());
    let task = match context.domain {
        Domain::Carbon => {
            "Based on this carbon footprint data, give 3 actionable suggestions to reduce emissions."
        }
        Domain::Mobility => {
            "Based on this trip, give 3 actionable suggestions to make the commute more sustainable."
        }
        Domain::Energy => {
            "Based on this building energy profile, give 3 actionable suggestions to cut consumption."
        }
    };
    format!("You are a sustainability advisor. {task}\nData: {facts}\n{RESPONSE_FORMAT}")
}

/// Parses the first JSON array of suggestions in a completion. Code-fenced
/// blocks are tried before the surrounding prose, and within each candidate
/// every `[` is tried in turn, so bracketed asides do not hide the answer.
/// An empty list counts as malformed.
pub fn extract_suggestions(text: &str) -> Result<Vec<Suggestion>, AdvisorError> {
    let mut last_error = "no JSON array in completion".to_string();

    for candidate in fenced_blocks(text).into_iter().chain(std::iter::once(text)) {
        for (start, _) in candidate.match_indices('[') {
            let mut values = serde_json::Deserializer::from_str(&candidate[start..])
                .into_iter::<Vec<Suggestion>>();
            match values.next() {
                Some(Ok(suggestions)) => {
                    let suggestions: Vec<Suggestion> = suggestions
                        .into_iter()
                        .filter(|suggestion| !suggestion.title.trim().is_empty())
                        .collect();
                    if !suggestions.is_empty() {
                        return Ok(suggestions);
                    }
                    last_error = "completion contained no suggestions".to_string();
                }
                Some(Err(error)) => last_error = error.to_string(),
                None => {}
            }
        }
    }

    Err(AdvisorError::MalformedResponse(last_error))
}

/// Bodies of ``` fenced blocks, without the info string line.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find("```") {
        let after = &rest[open + 3..];
        let body_start = after.find('\n').map_or(after.len(), |index| index + 1);
        let body = &after[body_start..];
        let Some(close) = body.find("```") else {
            break;
        };
        blocks.push(&body[..close]);
        rest = &body[close + 3..];
    }
    blocks
}
