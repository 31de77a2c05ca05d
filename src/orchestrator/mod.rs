//! Fan-out race coordinator.
//!
//! ```text
//! caller ─▶ Orchestrator::dispatch
//!             ├─ ContextManager::recent ──▶ compose_prompt
//!             ├─ BreakerRegistry::eligible_backends
//!             ├─ one task per backend ──▶ BackendAdapter::generate
//!             │     └─ records success / failure in the breaker
//!             ├─ first usable reply wins, or the deadline / exhaustion
//!             │     hands over to FallbackResponder::respond
//!             └─ ContextManager::append_exchange
//! ```

pub mod coordinator;
pub mod prompt;
pub mod types;

#[cfg(test)]
mod tests;

pub use coordinator::Orchestrator;
pub use prompt::{LabelStripper, compose_prompt};
pub use types::{
    BackendStatus, DispatchRequest, DispatchResult, OrchestratorSettings, ResponseSource,
};
