use crate::breaker::BreakerRegistry;
use crate::config::{ConfigError, RelayConfig};
use crate::context::{ContextEntry, ContextManager};
use crate::fallback::FallbackResponder;
use crate::llm::{AdapterFactory, BackendDescriptor, BackendError, deadline_after, run_bounded};
use crate::orchestrator::prompt::{LabelStripper, compose_prompt};
use crate::orchestrator::types::{
    BackendStatus, DispatchRequest, DispatchResult, OrchestratorSettings, ResponseSource,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

/// Fans a prompt out to every eligible backend and keeps the first usable reply.
///
/// Breaker and context registries are injected so that several orchestrators
/// (tests, multiple bots in one process) never share state by accident.
pub struct Orchestrator {
    settings: OrchestratorSettings,
    backends: Vec<BackendDescriptor>,
    breakers: Arc<BreakerRegistry>,
    contexts: Arc<ContextManager>,
    fallback: FallbackResponder,
    stripper: LabelStripper,
    shutdown: CancellationToken,
}

/// Internal result of one race. Exhaustion never reaches the caller.
#[derive(Debug)]
enum RaceOutcome {
    Won { backend: String, text: String },
    Exhausted(ExhaustReason),
}

#[derive(Debug, Clone, Copy)]
enum ExhaustReason {
    NoEligibleBackends,
    AllFailed,
    DeadlineElapsed,
}

struct CallOutcome {
    backend: String,
    result: Result<String, BackendError>,
    elapsed: Duration,
}

impl Orchestrator {
    pub fn new(
        settings: OrchestratorSettings,
        backends: Vec<BackendDescriptor>,
        breakers: Arc<BreakerRegistry>,
        contexts: Arc<ContextManager>,
        fallback: FallbackResponder,
    ) -> Result<Self, ConfigError> {
        let mut labels = settings.strip_labels.clone();
        labels.push(settings.bot_name.clone());
        let stripper = LabelStripper::new(&labels)?;

        Ok(Self {
            settings,
            backends,
            breakers,
            contexts,
            fallback,
            stripper,
            shutdown: CancellationToken::new(),
        })
    }

    /// Build adapters and registries from a validated configuration.
    ///
    /// Backends whose adapter cannot be created (missing API key, bad client
    /// setup) are skipped with a warning; an orchestrator with no backends
    /// still answers through the fallback responder.
    pub fn from_config(config: &RelayConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let factory = AdapterFactory::new(config.breaker_cooldown()).map_err(|source| {
            ConfigError::Backend {
                name: "http-client".to_string(),
                source,
            }
        })?;

        let mut backends = Vec::new();
        for backend in config.backends.iter().filter(|b| b.enabled) {
            match factory.create_descriptor(backend) {
                Ok(descriptor) => {
                    info!(
                        backend = %backend.name,
                        provider = %backend.kind,
                        timeout_secs = backend.per_call_timeout_secs,
                        "Backend configured"
                    );
                    backends.push(descriptor);
                }
                Err(error) => {
                    warn!(backend = %backend.name, error = %error, "Skipping backend");
                }
            }
        }

        if backends.is_empty() {
            warn!("No backends available, every reply will come from the fallback responder");
        }

        Self::new(
            config.orchestrator_settings(),
            backends,
            Arc::new(BreakerRegistry::new(config.breaker_cooldown())),
            Arc::new(ContextManager::new(config.context_window_size)),
            FallbackResponder::new(config.fallback.clone()),
        )
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn backends(&self) -> &[BackendDescriptor] {
        &self.backends
    }

    pub fn breakers(&self) -> &Arc<BreakerRegistry> {
        &self.breakers
    }

    pub fn contexts(&self) -> &Arc<ContextManager> {
        &self.contexts
    }

    /// Reply to `user_text` in `conversation_id`. Never fails.
    pub async fn orchestrate(&self, conversation_id: &str, user_text: &str) -> String {
        self.dispatch(conversation_id, &self.settings.user_label, user_text)
            .await
            .text
    }

    /// Like [`orchestrate`](Self::orchestrate), recording `speaker` as the
    /// author in the conversation context and reporting where the text came from.
    pub async fn dispatch(
        &self,
        conversation_id: &str,
        speaker: &str,
        user_text: &str,
    ) -> DispatchResult {
        let started = Instant::now();
        let request = self.build_request(conversation_id, user_text).await;
        let span = info_span!(
            "dispatch",
            request_id = %request.id,
            conversation = %conversation_id,
            eligible = request.backends.len()
        );

        async move {
            let (text, source) = match self.race(&request).await {
                RaceOutcome::Won { backend, text } => {
                    info!(backend = %backend, elapsed_ms = started.elapsed().as_millis() as u64, "Backend won the race");
                    (text, ResponseSource::Backend(backend))
                }
                RaceOutcome::Exhausted(reason) => {
                    warn!(reason = ?reason, "No backend produced a reply, using fallback");
                    (
                        self.fallback.respond(&request.user_text),
                        ResponseSource::Fallback,
                    )
                }
            };

            self.contexts
                .append_exchange(
                    conversation_id,
                    ContextEntry::new(speaker, user_text),
                    ContextEntry::new(self.settings.bot_name.as_str(), text.as_str()),
                )
                .await;

            DispatchResult {
                text,
                source,
                elapsed: started.elapsed(),
            }
        }
        .instrument(span)
        .await
    }

    async fn build_request(&self, conversation_id: &str, user_text: &str) -> DispatchRequest {
        let context = self.contexts.recent(conversation_id).await;
        let prompt = compose_prompt(self.settings.persona.as_deref(), &context, user_text);

        DispatchRequest {
            id: Uuid::new_v4(),
            conversation_id: conversation_id.to_string(),
            user_text: user_text.to_string(),
            prompt,
            deadline: deadline_after(self.settings.overall_timeout),
            backends: self.breakers.eligible_backends(&self.backends),
        }
    }

    async fn race(&self, request: &DispatchRequest) -> RaceOutcome {
        if request.backends.is_empty() {
            return RaceOutcome::Exhausted(ExhaustReason::NoEligibleBackends);
        }

        // Every call sends exactly once, so a channel sized to the field never blocks.
        let (tx, mut rx) = mpsc::channel(request.backends.len());
        let race_token = self.shutdown.child_token();

        for descriptor in &request.backends {
            self.spawn_call(descriptor, &request.prompt, race_token.child_token(), tx.clone());
        }
        drop(tx);

        let deadline = tokio::time::sleep_until(request.deadline);
        tokio::pin!(deadline);

        let outcome = loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(CallOutcome { backend, result: Ok(text), .. }) => {
                        break RaceOutcome::Won { backend, text };
                    }
                    Some(CallOutcome { backend, result: Err(error), elapsed }) => {
                        debug!(backend = %backend, error = %error, elapsed_ms = elapsed.as_millis() as u64, "Backend dropped out of the race");
                    }
                    None => break RaceOutcome::Exhausted(ExhaustReason::AllFailed),
                },
                _ = &mut deadline => {
                    break RaceOutcome::Exhausted(ExhaustReason::DeadlineElapsed);
                }
            }
        };

        if self.settings.cancel_losers {
            race_token.cancel();
        }

        outcome
    }

    /// Run one backend call on its own task.
    ///
    /// The task owns the breaker update, so a call that outlives the race
    /// (abandoned after another backend won or after the deadline) still
    /// records its outcome. It never touches the conversation context.
    fn spawn_call(
        &self,
        descriptor: &BackendDescriptor,
        prompt: &str,
        cancel: CancellationToken,
        tx: mpsc::Sender<CallOutcome>,
    ) {
        let adapter = Arc::clone(&descriptor.adapter);
        let breakers = Arc::clone(&self.breakers);
        let stripper = self.stripper.clone();
        let backend = descriptor.name.clone();
        let timeout = descriptor.timeout;
        let prompt = prompt.to_string();

        let task = async move {
            let started = Instant::now();
            let raw = run_bounded(
                timeout,
                &cancel,
                adapter.generate(prompt, timeout, cancel.clone()),
            )
            .await;

            let result = match raw {
                Ok(text) => match stripper.clean(&text) {
                    Some(text) => {
                        breakers.record_success(&backend);
                        Ok(text)
                    }
                    None => {
                        let error = BackendError::EmptyResponse;
                        warn!(backend = %backend, error = %error, "Backend call failed");
                        breakers.record_failure(&backend, &error.to_string());
                        Err(error)
                    }
                },
                Err(BackendError::Cancelled) => {
                    debug!(backend = %backend, "Backend call cancelled");
                    Err(BackendError::Cancelled)
                }
                Err(error) => {
                    warn!(backend = %backend, kind = error.kind(), error = %error, "Backend call failed");
                    breakers.record_failure(&backend, &error.to_string());
                    Err(error)
                }
            };

            let outcome = CallOutcome {
                backend: backend.clone(),
                result,
                elapsed: started.elapsed(),
            };
            if tx.send(outcome).await.is_err() {
                debug!(backend = %backend, "Race already decided, outcome discarded");
            }
        };

        tokio::spawn(task.in_current_span());
    }

    /// Current breaker view of every configured backend, in configured order.
    pub fn status(&self) -> Vec<BackendStatus> {
        self.backends
            .iter()
            .map(|descriptor| {
                let state = self.breakers.snapshot(&descriptor.name);
                let cooldown_remaining = self.breakers.cooldown_remaining(&descriptor.name);
                BackendStatus {
                    name: descriptor.name.clone(),
                    provider: descriptor.provider_name().to_string(),
                    eligible: cooldown_remaining.is_none(),
                    cooldown_remaining,
                    consecutive_failures: state.consecutive_failures,
                    total_failures: state.total_failures,
                    total_successes: state.total_successes,
                    last_failure_time: state.last_failure_time,
                    last_error: state.last_error,
                }
            })
            .collect()
    }

    pub async fn reset_conversation(&self, conversation_id: &str) -> bool {
        self.contexts.clear(conversation_id).await
    }

    /// Cancel every in-flight backend call. Later dispatches go straight to
    /// the fallback responder because their calls start out cancelled.
    pub fn shutdown(&self) {
        info!("Shutting down orchestrator");
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
