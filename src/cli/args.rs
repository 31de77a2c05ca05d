//! Command line argument parsing
//!
//! This module handles CLI argument parsing with subcommands:
//! - `ask`: Send one message through the relay and print the reply
//! - `chat`: Read messages from stdin, one per line
//! - `show-config`: Show configuration discovery information
//! - `init-config`: Write a default configuration file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, PartialEq)]
pub enum ExecutionMode {
    Ask(AskConfig),
    Chat(ChatConfig),
    ShowConfig,
    InitConfig(Option<PathBuf>),
}

#[derive(Debug, PartialEq)]
pub struct AskConfig {
    pub text: String,
    pub conversation: String,
    pub config_override: Option<PathBuf>,
    pub verbose: bool,
}

#[derive(Debug, PartialEq)]
pub struct ChatConfig {
    pub conversation: String,
    pub config_override: Option<PathBuf>,
    pub verbose: bool,
}

#[derive(Debug, Parser)]
#[command(name = "prompt-relay")]
#[command(author = "Prompt Relay Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Races a prompt across several text-generation backends and falls back to canned replies"
)]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Send a single message and print the reply
    Ask {
        /// Message text
        text: String,
        /// Conversation identifier used for context
        #[arg(long = "conversation", default_value = "cli")]
        conversation: String,
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
        /// Enable verbose output
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },
    /// Interactive chat on stdin (`/reset` clears context, `/status` shows breakers)
    Chat {
        /// Conversation identifier used for context
        #[arg(long = "conversation", default_value = "cli")]
        conversation: String,
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
        /// Enable verbose output
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },
    /// Show configuration discovery information
    ShowConfig,
    /// Write a default configuration file (defaults to ~/.prompt-relay/config.toml)
    InitConfig {
        /// Destination path
        path: Option<PathBuf>,
    },
}

impl Args {
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    pub fn mode(&self) -> Result<ExecutionMode, String> {
        match &self.command {
            Some(Commands::Ask {
                text,
                conversation,
                config,
                verbose,
            }) => {
                if text.trim().is_empty() {
                    return Err("Message text must not be empty".to_string());
                }
                Ok(ExecutionMode::Ask(AskConfig {
                    text: text.clone(),
                    conversation: conversation.clone(),
                    config_override: config.clone(),
                    verbose: *verbose,
                }))
            }
            Some(Commands::Chat {
                conversation,
                config,
                verbose,
            }) => Ok(ExecutionMode::Chat(ChatConfig {
                conversation: conversation.clone(),
                config_override: config.clone(),
                verbose: *verbose,
            })),
            Some(Commands::ShowConfig) => Ok(ExecutionMode::ShowConfig),
            Some(Commands::InitConfig { path }) => Ok(ExecutionMode::InitConfig(path.clone())),
            None => Err(
                "No command specified. Use 'prompt-relay --help' to see available commands."
                    .to_string(),
            ),
        }
    }
}
