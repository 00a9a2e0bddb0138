//! Environment, command-line and UI configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use opencode_api::DEFAULT_BASE_URL;

pub const ENV_SERVER: &str = "OPENCODE_SERVER";
pub const ENV_THEME: &str = "OPENCODE_THEME";
pub const ENV_STATE_DIR: &str = "OPENCODE_TUI_STATE_DIR";
pub const ENV_LOG_FILE: &str = "OPENCODE_TUI_LOG_FILE";
pub const ENV_TIMEOUT_SEC: &str = "OPENCODE_TUI_TIMEOUT_SEC";

pub const DEFAULT_LEADER: &str = "ctrl+x";
pub const DEFAULT_THEME: &str = "opencode";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub server_url: String,
    pub theme: Option<String>,
    pub state_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub request_timeout: Option<Duration>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            server_url: env_string_opt(ENV_SERVER).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            theme: env_string_opt(ENV_THEME),
            state_dir: env_string_opt(ENV_STATE_DIR).map(PathBuf::from),
            log_file: env_string_opt(ENV_LOG_FILE).map(PathBuf::from),
            request_timeout: env_string_opt(ENV_TIMEOUT_SEC)
                .and_then(|value| value.trim().parse::<u64>().ok())
                .filter(|seconds| *seconds > 0)
                .map(Duration::from_secs),
        }
    }

    /// State directory, defaulting to `$HOME/.local/state/opencode`.
    pub fn resolved_state_dir(&self) -> PathBuf {
        if let Some(dir) = &self.state_dir {
            return dir.clone();
        }
        let home = env_string_opt("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        tui_state::default_state_dir(&home)
    }

    pub fn resolved_log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| tui_state::log_file_path(&self.resolved_state_dir()))
    }
}

/// Command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "opencode-tui", version, about = "Terminal client for an opencode server")]
pub struct CliArgs {
    /// Model to use, as `provider/model`.
    #[arg(short, long)]
    pub model: Option<String>,
    /// Prompt to send once the client is ready.
    #[arg(short, long)]
    pub prompt: Option<String>,
    /// Agent to start with.
    #[arg(long)]
    pub agent: Option<String>,
    /// Session id to resume.
    #[arg(short, long)]
    pub session: Option<String>,
}

/// Folds text piped on stdin into the `--prompt` value. Piped text stands
/// alone when no prompt was given and is appended on a new line otherwise.
/// Blank input leaves the prompt unchanged.
pub fn merge_piped_prompt(prompt: Option<String>, piped: &str) -> Option<String> {
    let piped = piped.trim();
    if piped.is_empty() {
        return prompt;
    }
    match prompt.filter(|prompt| !prompt.is_empty()) {
        Some(prompt) => Some(format!("{prompt}\n{piped}")),
        None => Some(piped.to_string()),
    }
}

/// Values the renderer needs; carried, not interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiConfig {
    pub theme: String,
    pub leader: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            leader: DEFAULT_LEADER.to_string(),
        }
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
