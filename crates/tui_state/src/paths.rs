use std::path::{Path, PathBuf};

pub const STATE_FILE_NAME: &str = "tui.json";
pub const LOG_FILE_NAME: &str = "tui.log";

/// `$HOME/.local/state/opencode` relative components.
pub const STATE_DIR: [&str; 3] = [".local", "state", "opencode"];

#[must_use]
pub fn default_state_dir(home: &Path) -> PathBuf {
    STATE_DIR
        .iter()
        .fold(home.to_path_buf(), |path, component| path.join(component))
}

#[must_use]
pub fn state_file_path(state_dir: &Path) -> PathBuf {
    state_dir.join(STATE_FILE_NAME)
}

#[must_use]
pub fn log_file_path(state_dir: &Path) -> PathBuf {
    state_dir.join(LOG_FILE_NAME)
}
