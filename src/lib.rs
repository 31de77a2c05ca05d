//! # Prompt Relay
//!
//! Gets a reply to a chat message from several unreliable text-generation
//! backends at once. The prompt is sent to every backend that is not cooling
//! down, the first usable reply wins, and when nothing usable arrives in time
//! a local keyword-based responder answers instead. Callers always get text.
//!
//! ## Architecture Overview
//!
//! - **[`llm`]**: Backend adapters (OpenAI-compatible, Ollama, HuggingFace, Gemini)
//!   behind one [`BackendAdapter`] trait
//! - **[`breaker`]**: Per-backend circuit breakers with a fixed cooldown
//! - **[`context`]**: Bounded per-conversation history used to build prompts
//! - **[`fallback`]**: Offline canned replies picked by intent
//! - **[`orchestrator`]**: The fan-out race tying everything together
//! - **[`config`]**: TOML configuration, discovered by [`cli::ConfigDiscovery`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use prompt_relay::{Orchestrator, RelayConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let orchestrator = Orchestrator::from_config(&RelayConfig::default())?;
//!
//!     let reply = orchestrator.orchestrate("general", "hello there").await;
//!     println!("{}", reply);
//!
//!     orchestrator.shutdown();
//!     Ok(())
//! }
//! ```

/// Backend adapters.
///
/// Each adapter turns a prompt into a reply string through one provider's
/// HTTP API, honoring a per-call timeout and a cancellation token.
pub mod llm;

/// Circuit breaker registry keyed by backend name.
pub mod breaker;

/// Per-conversation context windows.
pub mod context;

/// Keyword-classified canned replies used when every backend fails.
pub mod fallback;

/// Fan-out race coordinator.
///
/// Composes the prompt, races all eligible backends under an overall
/// deadline, records breaker outcomes and updates the conversation context.
pub mod orchestrator;

/// Relay configuration loaded from TOML.
pub mod config;

/// Environment constants and path utilities.
///
/// Centralizes the directory and file names used for configuration discovery.
pub mod env;

// CLI module for command-line interface
pub mod cli;

pub use breaker::{BreakerRegistry, BreakerState};
pub use config::{ConfigError, RelayConfig};
pub use context::{ContextEntry, ContextManager};
pub use fallback::{FallbackConfig, FallbackResponder, Intent};
pub use llm::{
    AdapterFactory, BackendAdapter, BackendConfig, BackendDescriptor, BackendError, BackendKind,
};
pub use orchestrator::{
    BackendStatus, DispatchResult, Orchestrator, OrchestratorSettings, ResponseSource,
};
