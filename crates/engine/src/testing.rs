//! Scripted engine double used by this crate's tests and by downstream crates
//! that exercise the pipeline without spawning processes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ecosim_core::domain::scenario::EngineRequest;
use serde_json::Value;

use crate::adapter::{EngineError, ScenarioEngine};

#[derive(Clone, Debug)]
struct ScriptedReply {
    outcome: Result<Value, EngineError>,
    delay: Duration,
}

/// Replies are looked up by alternative id first, then by engine type.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    by_type: HashMap<String, ScriptedReply>,
    by_alternative: HashMap<String, ScriptedReply>,
    started: AtomicUsize,
    completed: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedEngine {
    pub fn respond(mut self, engine_type: &str, value: Value) -> Self {
        self.by_type.insert(
            engine_type.to_string(),
            ScriptedReply { outcome: Ok(value), delay: Duration::ZERO },
        );
        self
    }

    pub fn fail(mut self, engine_type: &str, error: EngineError) -> Self {
        self.by_type.insert(
            engine_type.to_string(),
            ScriptedReply { outcome: Err(error), delay: Duration::ZERO },
        );
        self
    }

    pub fn respond_for(mut self, alternative_id: &str, value: Value, delay: Duration) -> Self {
        self.by_alternative
            .insert(alternative_id.to_string(), ScriptedReply { outcome: Ok(value), delay });
        self
    }

    pub fn fail_for(mut self, alternative_id: &str, error: EngineError, delay: Duration) -> Self {
        self.by_alternative
            .insert(alternative_id.to_string(), ScriptedReply { outcome: Err(error), delay });
        self
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn reply_for(&self, request: &EngineRequest) -> Option<ScriptedReply> {
        let by_alternative = match request {
            EngineRequest::Simulate(scenario) => {
                self.by_alternative.get(scenario.alternative_id.as_str())
            }
            EngineRequest::OptimizeEnergy(_) => None,
        };
        by_alternative.or_else(|| self.by_type.get(request.engine_type())).cloned()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ScenarioEngine for ScriptedEngine {
    async fn invoke(
        &self,
        request: &EngineRequest,
        _correlation_id: &str,
    ) -> Result<Value, EngineError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let reply = self.reply_for(request).ok_or_else(|| {
            EngineError::Unavailable(format!("no scripted reply for `{}`", request.engine_type()))
        })?;
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }

        self.completed.fetch_add(1, Ordering::SeqCst);
        reply.outcome
    }
}
