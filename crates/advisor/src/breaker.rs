use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_started_at: Option<Instant>,
}

/// Consecutive-failure circuit breaker guarding the remote advisor.
///
/// Once open, calls are skipped until the cooldown has elapsed. The first call
/// after that is a trial and every other caller is still turned away while it
/// runs: success closes the circuit, failure reopens it. A trial that never
/// reports back is abandoned after another cooldown.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            cooldown,
            state: Mutex::new(BreakerState::default()),
        }
    }

    /// Admits a call, claiming the trial slot when the circuit is half open.
    pub fn allows_request(&self) -> bool {
        let mut state = self.lock();
        let Some(opened_at) = state.opened_at else {
            return true;
        };
        if opened_at.elapsed() < self.cooldown || self.trial_pending(&state) {
            return false;
        }
        state.trial_started_at = Some(Instant::now());
        true
    }

    pub fn record_success(&self) {
        let mut state = self.lock();
        state.consecutive_failures = 0;
        state.opened_at = None;
        state.trial_started_at = None;
    }

    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.trial_started_at = None;
        if state.consecutive_failures >= self.failure_threshold {
            state.opened_at = Some(Instant::now());
        }
    }

    /// True while calls are being turned away. Does not claim a trial.
    pub fn is_open(&self) -> bool {
        let state = self.lock();
        match state.opened_at {
            Some(opened_at) => opened_at.elapsed() < self.cooldown || self.trial_pending(&state),
            None => false,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    fn trial_pending(&self, state: &BreakerState) -> bool {
        state.trial_started_at.is_some_and(|started_at| started_at.elapsed() < self.cooldown)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerState> {
        // state is plain counters, so a poisoned lock is still consistent
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
