use super::*;
use crate::breaker::{BreakerRegistry, BreakerState};
use crate::context::{ContextEntry, ContextManager};
use crate::fallback::{FallbackConfig, FallbackResponder};
use crate::llm::{BackendAdapter, BackendDescriptor, BackendError};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Replies with a fixed result after a fixed delay, recording every prompt.
struct ScriptedAdapter {
    delay: Duration,
    reply: Result<String, BackendError>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedAdapter {
    fn ok(delay_ms: u64, text: &str) -> Arc<Self> {
        Self::with(delay_ms, Ok(text.to_string()))
    }

    fn failing(delay_ms: u64) -> Arc<Self> {
        Self::with(
            delay_ms,
            Err(BackendError::Status {
                status: 503,
                body: "overloaded".to_string(),
            }),
        )
    }

    fn with(delay_ms: u64, reply: Result<String, BackendError>) -> Arc<Self> {
        Arc::new(Self {
            delay: Duration::from_millis(delay_ms),
            reply,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

impl BackendAdapter for ScriptedAdapter {
    fn generate(
        &self,
        prompt: String,
        _timeout: Duration,
        cancel: CancellationToken,
    ) -> BoxFuture<'_, Result<String, BackendError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt);
        Box::pin(async move {
            tokio::select! {
                _ = cancel.cancelled() => Err(BackendError::Cancelled),
                _ = tokio::time::sleep(self.delay) => self.reply.clone(),
            }
        })
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

fn descriptor(name: &str, timeout_secs: u64, adapter: &Arc<ScriptedAdapter>) -> BackendDescriptor {
    let adapter: Arc<dyn BackendAdapter> = adapter.clone();
    BackendDescriptor::new(name, Duration::from_secs(timeout_secs), adapter)
}

fn orchestrator(backends: Vec<BackendDescriptor>, settings: OrchestratorSettings) -> Orchestrator {
    Orchestrator::new(
        settings,
        backends,
        Arc::new(BreakerRegistry::new(Duration::from_secs(60))),
        Arc::new(ContextManager::new(3)),
        FallbackResponder::default(),
    )
    .unwrap()
}

#[test]
fn test_compose_prompt_layout() {
    let context = vec![
        ContextEntry::new("alice", "hi"),
        ContextEntry::new("Relay", "hello alice"),
    ];

    assert_eq!(
        compose_prompt(None, &context, "how are you?"),
        "alice: hi\nRelay: hello alice\nhow are you?"
    );
    assert_eq!(
        compose_prompt(Some("You are helpful."), &[], "ping"),
        "You are helpful.\n\nping"
    );
    assert_eq!(compose_prompt(Some("   "), &[], "ping"), "ping");
}

#[test]
fn test_label_stripper() {
    let stripper = LabelStripper::new(["AI", "Assistant:", "Relay"]).unwrap();

    assert_eq!(stripper.strip("Assistant: Sure thing"), "Sure thing");
    assert_eq!(stripper.strip("  assistant :  Sure"), "Sure");
    assert_eq!(stripper.strip("Relay: AI: nested"), "nested");
    assert_eq!(stripper.strip("The AI: label stays mid-text"), "The AI: label stays mid-text");
    assert_eq!(stripper.clean("Assistant:   "), None);
    assert_eq!(stripper.clean("plain"), Some("plain".to_string()));

    let passthrough = LabelStripper::new(Vec::<String>::new()).unwrap();
    assert_eq!(passthrough.strip(" AI: kept "), "AI: kept");
}

#[tokio::test(start_paused = true)]
async fn test_first_success_wins_and_late_timeout_still_opens_breaker() {
    let slow = ScriptedAdapter::ok(20_000, "too late");
    let broken = ScriptedAdapter::failing(0);
    let good = ScriptedAdapter::ok(2_000, "ok");

    let orchestrator = orchestrator(
        vec![
            descriptor("A", 10, &slow),
            descriptor("B", 10, &broken),
            descriptor("C", 10, &good),
        ],
        OrchestratorSettings::default(),
    );

    let result = orchestrator.dispatch("general", "alice", "status?").await;
    assert_eq!(result.text, "ok");
    assert_eq!(result.source_backend(), Some("C"));
    assert!(result.success());
    assert!(result.elapsed >= Duration::from_secs(2));
    assert!(result.elapsed < Duration::from_secs(3));

    let breakers = orchestrator.breakers();
    assert!(!breakers.is_eligible("B"));
    assert!(breakers.is_eligible("C"));
    assert!(breakers.is_eligible("A"), "A has not timed out yet");

    tokio::time::sleep(Duration::from_secs(9)).await;
    assert!(!breakers.is_eligible("A"));
    let a_state = breakers.snapshot("A");
    assert!(a_state.last_error.unwrap().starts_with("Timed out"));
}

#[tokio::test(start_paused = true)]
async fn test_arrival_order_beats_dispatch_order() {
    let later = ScriptedAdapter::ok(2_000, "from B");
    let sooner = ScriptedAdapter::ok(1_000, "from A");

    let orchestrator = orchestrator(
        vec![descriptor("B", 10, &later), descriptor("A", 10, &sooner)],
        OrchestratorSettings::default(),
    );

    let result = orchestrator.dispatch("general", "alice", "hey").await;
    assert_eq!(result.source_backend(), Some("A"));
    assert_eq!(result.text, "from A");

    tokio::time::sleep(Duration::from_secs(5)).await;
    let recent = orchestrator.contexts().recent("general").await;
    assert_eq!(recent.last().unwrap().text, "from A");
    assert_eq!(orchestrator.breakers().snapshot("B").total_successes, 1);
}

#[tokio::test(start_paused = true)]
async fn test_all_hanging_backends_hit_overall_deadline() {
    let hang_a = ScriptedAdapter::ok(100_000, "never");
    let hang_b = ScriptedAdapter::ok(100_000, "never");

    let orchestrator = orchestrator(
        vec![descriptor("A", 60, &hang_a), descriptor("B", 60, &hang_b)],
        OrchestratorSettings {
            overall_timeout: Duration::from_secs(15),
            ..OrchestratorSettings::default()
        },
    );

    let result = orchestrator.dispatch("general", "alice", "hello?").await;
    assert_eq!(result.source, ResponseSource::Fallback);
    assert!(!result.text.trim().is_empty());
    assert!(result.elapsed >= Duration::from_secs(15));
    assert!(result.elapsed < Duration::from_secs(16));
}

#[tokio::test(start_paused = true)]
async fn test_all_failures_fall_back_before_deadline() {
    let a = ScriptedAdapter::failing(100);
    let b = ScriptedAdapter::failing(300);

    let orchestrator = orchestrator(
        vec![descriptor("A", 10, &a), descriptor("B", 10, &b)],
        OrchestratorSettings::default(),
    );

    let result = orchestrator.dispatch("general", "alice", "what is rust").await;
    assert!(!result.success());
    assert!(result.elapsed >= Duration::from_millis(300));
    assert!(result.elapsed < Duration::from_secs(1));
    assert!(
        FallbackConfig::default()
            .question_responses
            .contains(&result.text)
    );
    assert!(!orchestrator.breakers().is_eligible("A"));
    assert!(!orchestrator.breakers().is_eligible("B"));
}

#[tokio::test(start_paused = true)]
async fn test_cooling_backends_are_not_called() {
    let a = ScriptedAdapter::ok(10, "hi");
    let b = ScriptedAdapter::ok(10, "hi");

    let orchestrator = orchestrator(
        vec![descriptor("A", 10, &a), descriptor("B", 10, &b)],
        OrchestratorSettings::default(),
    );
    orchestrator.breakers().record_failure("A", "earlier failure");
    orchestrator.breakers().record_failure("B", "earlier failure");

    let result = orchestrator.dispatch("general", "alice", "hello").await;
    assert_eq!(result.source, ResponseSource::Fallback);
    assert!(result.elapsed < Duration::from_millis(1));
    assert_eq!(a.calls(), 0);
    assert_eq!(b.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_expiry_lets_backend_back_in() {
    let flaky = ScriptedAdapter::ok(10, "back again");
    let orchestrator = orchestrator(
        vec![descriptor("flaky", 10, &flaky)],
        OrchestratorSettings::default(),
    );
    orchestrator.breakers().record_failure("flaky", "boom");

    let first = orchestrator.dispatch("general", "alice", "hi").await;
    assert!(!first.success());

    tokio::time::advance(Duration::from_secs(60)).await;
    let second = orchestrator.dispatch("general", "alice", "hi").await;
    assert_eq!(second.source_backend(), Some("flaky"));
    assert_eq!(flaky.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_label_only_reply_counts_as_failure() {
    let echo = ScriptedAdapter::ok(10, "Assistant:   ");
    let real = ScriptedAdapter::ok(50, "Assistant: Real answer");

    let orchestrator = orchestrator(
        vec![descriptor("echo", 10, &echo), descriptor("real", 10, &real)],
        OrchestratorSettings::default(),
    );

    let result = orchestrator.dispatch("general", "alice", "question").await;
    assert_eq!(result.text, "Real answer");
    assert_eq!(result.source_backend(), Some("real"));
    assert!(!orchestrator.breakers().is_eligible("echo"));
}

#[tokio::test(start_paused = true)]
async fn test_bot_name_is_stripped_from_replies() {
    let backend = ScriptedAdapter::ok(10, "Relay: hello there");
    let orchestrator = orchestrator(
        vec![descriptor("only", 10, &backend)],
        OrchestratorSettings::default(),
    );

    assert_eq!(orchestrator.orchestrate("general", "hi").await, "hello there");
}

#[tokio::test(start_paused = true)]
async fn test_context_feeds_next_prompt() {
    let backend = ScriptedAdapter::ok(10, "pong");
    let orchestrator = orchestrator(
        vec![descriptor("only", 10, &backend)],
        OrchestratorSettings {
            persona: Some("Be brief.".to_string()),
            ..OrchestratorSettings::default()
        },
    );

    orchestrator.dispatch("dev", "alice", "ping").await;
    assert_eq!(backend.last_prompt().unwrap(), "Be brief.\n\nping");

    orchestrator.dispatch("dev", "alice", "again").await;
    assert_eq!(
        backend.last_prompt().unwrap(),
        "Be brief.\n\nalice: ping\nRelay: pong\nagain"
    );

    let recent = orchestrator.contexts().recent("dev").await;
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0], ContextEntry::new("Relay", "pong"));
    assert_eq!(recent[2], ContextEntry::new("Relay", "pong"));

    assert!(orchestrator.reset_conversation("dev").await);
    orchestrator.dispatch("dev", "alice", "fresh").await;
    assert_eq!(backend.last_prompt().unwrap(), "Be brief.\n\nfresh");
}

#[tokio::test(start_paused = true)]
async fn test_fallback_uses_raw_user_text() {
    let orchestrator = orchestrator(Vec::new(), OrchestratorSettings::default());

    orchestrator.dispatch("dev", "alice", "I pushed the fix").await;
    let reply = orchestrator.dispatch("dev", "alice", "hello").await;

    assert!(FallbackConfig::default().greeting_responses.contains(&reply.text));
    assert_eq!(orchestrator.contexts().recent("dev").await.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_losers_leaves_their_breakers_closed() {
    let slow = ScriptedAdapter::ok(5_000, "slow");
    let fast = ScriptedAdapter::ok(100, "fast");

    let orchestrator = orchestrator(
        vec![descriptor("slow", 2, &slow), descriptor("fast", 10, &fast)],
        OrchestratorSettings {
            cancel_losers: true,
            ..OrchestratorSettings::default()
        },
    );

    let result = orchestrator.dispatch("general", "alice", "go").await;
    assert_eq!(result.source_backend(), Some("fast"));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(orchestrator.breakers().is_eligible("slow"));
    assert_eq!(orchestrator.breakers().snapshot("slow"), BreakerState::default());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_calls_without_opening_breakers() {
    let backend = ScriptedAdapter::ok(10, "hi");
    let orchestrator = orchestrator(
        vec![descriptor("only", 10, &backend)],
        OrchestratorSettings::default(),
    );

    orchestrator.shutdown();
    assert!(orchestrator.is_shut_down());

    let result = orchestrator.dispatch("general", "alice", "hello").await;
    assert_eq!(result.source, ResponseSource::Fallback);
    assert!(orchestrator.breakers().is_eligible("only"));
}

#[tokio::test(start_paused = true)]
async fn test_status_reports_breakers_in_configured_order() {
    let ok = ScriptedAdapter::ok(10, "fine");
    let bad = ScriptedAdapter::failing(0);

    let orchestrator = orchestrator(
        vec![descriptor("bad", 10, &bad), descriptor("ok", 10, &ok)],
        OrchestratorSettings::default(),
    );
    orchestrator.dispatch("general", "alice", "hello").await;

    let status = orchestrator.status();
    assert_eq!(status.len(), 2);
    assert_eq!(status[0].name, "bad");
    assert!(!status[0].eligible);
    let remaining = status[0].cooldown_remaining.unwrap();
    assert!(remaining > Duration::from_secs(59));
    assert!(remaining <= Duration::from_secs(60));
    assert_eq!(status[0].provider, "scripted");
    assert!(status[0].last_error.as_deref().unwrap().contains("503"));
    assert_eq!(status[1].name, "ok");
    assert!(status[1].eligible);
    assert_eq!(status[1].total_successes, 1);
}

#[tokio::test(start_paused = true)]
async fn test_orchestrators_do_not_share_state() {
    let bad = ScriptedAdapter::failing(0);
    let first = orchestrator(vec![descriptor("shared", 10, &bad)], OrchestratorSettings::default());
    let second = orchestrator(vec![descriptor("shared", 10, &bad)], OrchestratorSettings::default());

    first.dispatch("general", "alice", "hello").await;

    assert!(!first.breakers().is_eligible("shared"));
    assert!(second.breakers().is_eligible("shared"));
    assert!(second.contexts().recent("general").await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unbounded_overall_timeout_still_answers() {
    let settings = OrchestratorSettings {
        overall_timeout: Duration::from_secs(u64::MAX),
        ..OrchestratorSettings::default()
    };

    let idle = orchestrator(Vec::new(), settings.clone());
    assert!(!idle.orchestrate("general", "hello").await.trim().is_empty());

    let backend = ScriptedAdapter::ok(10, "still here");
    let busy = orchestrator(vec![descriptor("only", 10, &backend)], settings);
    assert_eq!(busy.orchestrate("general", "hello").await, "still here");
}
