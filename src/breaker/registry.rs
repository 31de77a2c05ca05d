use crate::llm::BackendDescriptor;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Per-backend cooldown tracking.
///
/// A backend is eligible iff it has no recorded failure, or the fixed
/// cooldown has elapsed since its last failure. Updates are last-writer-wins;
/// the state is advisory and never blocks a call on its own.
#[derive(Debug)]
pub struct BreakerRegistry {
    cooldown: Duration,
    states: DashMap<String, BreakerState>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BreakerState {
    pub last_failure_at: Option<Instant>,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub total_failures: u64,
    pub total_successes: u64,
}

impl BreakerRegistry {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            states: DashMap::new(),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn is_eligible(&self, name: &str) -> bool {
        self.cooldown_remaining(name).is_none()
    }

    /// Time left before `name` becomes eligible again, if it is cooling down.
    pub fn cooldown_remaining(&self, name: &str) -> Option<Duration> {
        let state = self.states.get(name)?;
        let failed_at = state.last_failure_at?;
        let elapsed = Instant::now().saturating_duration_since(failed_at);

        if elapsed >= self.cooldown {
            None
        } else {
            Some(self.cooldown - elapsed)
        }
    }

    pub fn record_success(&self, name: &str) {
        let mut state = self.states.entry(name.to_string()).or_default();
        state.last_failure_at = None;
        state.consecutive_failures = 0;
        state.total_successes += 1;
    }

    pub fn record_failure(&self, name: &str, reason: &str) {
        let mut state = self.states.entry(name.to_string()).or_default();
        state.last_failure_at = Some(Instant::now());
        state.last_failure_time = Some(Utc::now());
        state.last_error = Some(reason.to_string());
        state.consecutive_failures += 1;
        state.total_failures += 1;

        debug!(
            backend = name,
            consecutive_failures = state.consecutive_failures,
            cooldown_secs = self.cooldown.as_secs(),
            "Breaker opened"
        );
    }

    /// Filter `all` down to eligible backends, keeping configured order.
    pub fn eligible_backends(&self, all: &[BackendDescriptor]) -> Vec<BackendDescriptor> {
        all.iter()
            .filter(|descriptor| self.is_eligible(&descriptor.name))
            .cloned()
            .collect()
    }

    /// Copy of the recorded state for `name`; default if never touched.
    pub fn snapshot(&self, name: &str) -> BreakerState {
        self.states
            .get(name)
            .map(|state| state.clone())
            .unwrap_or_default()
    }
}
