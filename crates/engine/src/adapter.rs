//! Scenario Engine Adapter.
//!
//! Every computation runs in a fresh engine process: the request is written
//! to standard input as one JSON object, standard input is closed, and the
//! whole of standard output is parsed as one JSON value once the process has
//! exited. Standard error is diagnostics only and never reaches callers.

use std::io::ErrorKind;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ecosim_core::config::EngineConfig;
use ecosim_core::domain::comparison::FailureKind;
use ecosim_core::domain::scenario::EngineRequest;
use ecosim_core::errors::ApplicationError;
use serde_json::Value;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Longest stderr excerpt kept in a [`EngineError::ComputationFailed`].
const MAX_DIAGNOSTIC_BYTES: usize = 4096;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("engine exited unsuccessfully (exit code {exit_code:?})")]
    ComputationFailed { exit_code: Option<i32>, diagnostics: String },
    #[error("engine produced malformed output: {0}")]
    MalformedOutput(String),
    #[error("engine did not finish within {0:?}")]
    Timeout(Duration),
    #[error("engine unavailable: {0}")]
    Unavailable(String),
}

impl EngineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ComputationFailed { .. } => FailureKind::ComputationFailed,
            Self::MalformedOutput(_) => FailureKind::MalformedOutput,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::Unavailable(_) => FailureKind::Unavailable,
        }
    }
}

impl From<EngineError> for ApplicationError {
    fn from(error: EngineError) -> Self {
        ApplicationError::Simulation { kind: error.kind(), detail: error.to_string() }
    }
}

#[async_trait]
pub trait ScenarioEngine: Send + Sync {
    /// Runs one computation and returns the engine's raw JSON output.
    async fn invoke(&self, request: &EngineRequest, correlation_id: &str)
        -> Result<Value, EngineError>;
}

/// Engine backed by an external program, bounded by a shared permit pool.
#[derive(Clone)]
pub struct ProcessEngine {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl ProcessEngine {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        timeout: Duration,
        max_concurrency: usize,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.program.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
            config.max_concurrency,
        )
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    async fn run(&self, input: Vec<u8>) -> Result<std::process::Output, EngineError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|error| {
                EngineError::Unavailable(format!("failed to start `{}`: {error}", self.program))
            })?;

        let stdin = child.stdin.take();
        let feed = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(&input).await {
                // the engine may exit before reading everything; its exit status decides
                Err(error) if error.kind() == ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
            // dropping stdin here closes the pipe
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        if let Err(error) = fed {
            debug!(
                event_name = "engine.invoke.stdin_failed",
                error = %error,
                "could not write the full request to the engine"
            );
        }
        output.map_err(|error| EngineError::Unavailable(format!("engine wait failed: {error}")))
    }
}

#[async_trait]
impl ScenarioEngine for ProcessEngine {
    async fn invoke(
        &self,
        request: &EngineRequest,
        correlation_id: &str,
    ) -> Result<Value, EngineError> {
        let engine_type = request.engine_type();
        let input = request
            .to_wire()
            .and_then(|payload| serde_json::to_vec(&payload))
            .map_err(|error| EngineError::Unavailable(format!("could not encode request: {error}")))?;

        // the deadline covers waiting for a permit as well as the run itself
        let deadline = tokio::time::Instant::now() + self.timeout;
        let _permit = tokio::time::timeout_at(deadline, self.permits.acquire())
            .await
            .map_err(|_| EngineError::Timeout(self.timeout))?
            .map_err(|_| EngineError::Unavailable("engine permit pool is closed".to_string()))?;

        debug!(
            event_name = "engine.invoke.start",
            correlation_id,
            engine_type,
            program = %self.program,
            "starting engine process"
        );

        let output = match tokio::time::timeout_at(deadline, self.run(input)).await {
            Ok(output) => output,
            Err(_) => {
                warn!(
                    event_name = "engine.invoke.timeout",
                    correlation_id,
                    engine_type,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "engine process exceeded its deadline and was killed"
                );
                return Err(EngineError::Timeout(self.timeout));
            }
        };
        let output = match output {
            Ok(output) => output,
            Err(error) => {
                warn!(
                    event_name = "engine.invoke.unavailable",
                    correlation_id,
                    engine_type,
                    error = %error,
                    "engine process could not be run"
                );
                return Err(error);
            }
        };

        if !output.status.success() {
            let diagnostics = diagnostics_excerpt(&output.stderr);
            warn!(
                event_name = "engine.invoke.failed",
                correlation_id,
                engine_type,
                exit_code = ?output.status.code(),
                diagnostics = %diagnostics,
                "engine process exited unsuccessfully"
            );
            return Err(EngineError::ComputationFailed {
                exit_code: output.status.code(),
                diagnostics,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let value = serde_json::from_str::<Value>(stdout.trim()).map_err(|error| {
            warn!(
                event_name = "engine.invoke.malformed",
                correlation_id,
                engine_type,
                error = %error,
                stdout_bytes = output.stdout.len(),
                "engine output is not valid JSON"
            );
            EngineError::MalformedOutput(error.to_string())
        })?;

        debug!(event_name = "engine.invoke.completed", correlation_id, engine_type, "engine run completed");
        Ok(value)
    }
}

fn diagnostics_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    if trimmed.len() <= MAX_DIAGNOSTIC_BYTES {
        return trimmed.to_string();
    }
    let mut cut = trimmed.len() - MAX_DIAGNOSTIC_BYTES;
    while !trimmed.is_char_boundary(cut) {
        cut += 1;
    }
    format!("...{}", &trimmed[cut..])
}
