use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use ecosim_core::domain::scenario::Domain;
use ecosim_core::domain::suggestion::{SuggestionContext, SuggestionOutcome};
use serde_json::{Map, Value};

use super::{json_body, ApiResult, AppState, CorrelationId};

/// Free-form facts about the caller's situation; any JSON object is accepted.
pub(crate) type SuggestionFacts = Map<String, Value>;

pub(crate) async fn suggest(
    state: &AppState,
    domain: Domain,
    correlation_id: &CorrelationId,
    body: Result<Json<SuggestionFacts>, JsonRejection>,
) -> ApiResult<Json<SuggestionOutcome>> {
    let facts = json_body(body, correlation_id)?;
    let context = SuggestionContext {
        domain,
        facts: facts.into_iter().collect::<BTreeMap<_, _>>(),
    };

    Ok(Json(state.advisor.suggestions(&context, correlation_id.as_str()).await))
}
