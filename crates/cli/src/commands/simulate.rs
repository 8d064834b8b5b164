use std::sync::Arc;

use ecosim_core::domain::scenario::{Domain, ScenarioPayload, ScenarioRequest};
use ecosim_engine::{ProcessEngine, ScenarioSimulator};
use serde_json::Value;

use crate::commands::{load_config, runtime, CommandResult};

const COMMAND: &str = "simulate";

pub fn run(domain: &str, scenario: &str) -> CommandResult {
    let request = match parse_request(domain, scenario) {
        Ok(request) => request,
        Err(message) => return CommandResult::failure(COMMAND, "invalid_input", message, 2),
    };
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let simulator = ScenarioSimulator::new(Arc::new(ProcessEngine::from_config(&config.engine)));
    let result = runtime.block_on(simulator.simulate(&request, "cli"));

    match result {
        Ok(result) => match serde_json::to_string_pretty(&result) {
            Ok(output) => CommandResult { exit_code: 0, output },
            Err(error) => CommandResult::failure(COMMAND, "serialization", error.to_string(), 3),
        },
        Err(error) => CommandResult::failure(COMMAND, error.kind().as_str(), error.to_string(), 7),
    }
}

fn parse_request(domain: &str, scenario: &str) -> Result<ScenarioRequest, String> {
    let domain = Domain::parse(domain)
        .ok_or_else(|| format!("unknown domain `{domain}`; expected energy, mobility or carbon"))?;

    let mut parameters = match serde_json::from_str::<Value>(scenario) {
        Ok(Value::Object(parameters)) => parameters,
        Ok(_) => return Err("scenario must be a JSON object".to_string()),
        Err(error) => return Err(format!("scenario is not valid JSON: {error}")),
    };
    parameters.insert("domain".to_string(), Value::String(domain.as_str().to_string()));

    let payload: ScenarioPayload = serde_json::from_value(Value::Object(parameters))
        .map_err(|error| format!("invalid {} scenario: {error}", domain.as_str()))?;

    Ok(ScenarioRequest::new(domain.as_str(), payload))
}
