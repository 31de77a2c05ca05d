//! Environment constants and path utilities for prompt-relay.
//!
//! This module centralizes the directory and file names used for
//! configuration discovery, making them easier to maintain and modify.

/// Application directory name (hidden directory like .git, .vscode)
pub const RELAY_DIR_NAME: &str = ".prompt-relay";

/// Configuration file name inside the application directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file name looked up directly in the working directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "prompt-relay.toml";

/// System-wide configuration directory (Unix-like systems)
pub const SYSTEM_CONFIG_DIR: &str = "/etc/prompt-relay";

/// Log filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "prompt_relay=info";

/// Log filter used with `--verbose`
pub const VERBOSE_LOG_FILTER: &str = "prompt_relay=debug";

use std::path::{Path, PathBuf};

/// Build the .prompt-relay directory path from a base directory
pub fn relay_dir_path(base: &Path) -> PathBuf {
    base.join(RELAY_DIR_NAME)
}

/// Build config directory path in user's home directory
pub fn user_config_dir_path(home_dir: &Path) -> PathBuf {
    relay_dir_path(home_dir)
}

/// Build config file path in user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    user_config_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build `./prompt-relay.toml`
pub fn local_flat_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join(LOCAL_CONFIG_FILE_NAME)
}

/// Build `./.prompt-relay/config.toml`
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    relay_dir_path(current_dir).join(CONFIG_FILE_NAME)
}

pub fn system_config_file_path() -> PathBuf {
    Path::new(SYSTEM_CONFIG_DIR).join(CONFIG_FILE_NAME)
}
