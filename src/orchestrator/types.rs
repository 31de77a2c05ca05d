use crate::llm::BackendDescriptor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Runtime knobs of the race coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// Wall-clock bound for the whole race.
    pub overall_timeout: Duration,
    /// Speaker label recorded for the bot's replies.
    pub bot_name: String,
    /// Speaker label used by [`Orchestrator::orchestrate`](crate::Orchestrator::orchestrate).
    pub user_label: String,
    pub persona: Option<String>,
    /// Role labels stripped from the start of backend replies.
    pub strip_labels: Vec<String>,
    /// Cancel outstanding calls once a winner is chosen instead of letting
    /// them run to completion.
    pub cancel_losers: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            overall_timeout: Duration::from_secs(15),
            bot_name: "Relay".to_string(),
            user_label: "User".to_string(),
            persona: None,
            strip_labels: vec!["AI".to_string(), "Assistant".to_string(), "Bot".to_string()],
            cancel_losers: false,
        }
    }
}

/// Everything one race needs. Built fresh per call.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub id: Uuid,
    pub conversation_id: String,
    pub user_text: String,
    pub prompt: String,
    pub deadline: Instant,
    pub backends: Vec<BackendDescriptor>,
}

/// Where the returned text came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseSource {
    Backend(String),
    Fallback,
}

impl std::fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseSource::Backend(name) => write!(f, "{}", name),
            ResponseSource::Fallback => f.write_str("fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult {
    pub text: String,
    pub source: ResponseSource,
    pub elapsed: Duration,
}

impl DispatchResult {
    /// True when a real backend produced the text.
    pub fn success(&self) -> bool {
        matches!(self.source, ResponseSource::Backend(_))
    }

    pub fn source_backend(&self) -> Option<&str> {
        match &self.source {
            ResponseSource::Backend(name) => Some(name),
            ResponseSource::Fallback => None,
        }
    }
}

/// Operator-facing view of one backend's breaker.
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    pub name: String,
    pub provider: String,
    pub eligible: bool,
    pub cooldown_remaining: Option<Duration>,
    pub consecutive_failures: u32,
    pub total_failures: u64,
    pub total_successes: u64,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}
