//! CLI-specific functionality for prompt-relay
//!
//! This module contains argument parsing and configuration discovery
//! for the `prompt-relay` binary.

pub mod args;
pub mod config;

pub use args::{Args, AskConfig, ChatConfig, Commands, ExecutionMode};
pub use config::ConfigDiscovery;
