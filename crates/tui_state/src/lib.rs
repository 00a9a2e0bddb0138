mod error;
mod paths;
mod schema;
mod store;

pub use error::StateStoreError;
pub use paths::{default_state_dir, log_file_path, state_file_path, LOG_FILE_NAME, STATE_FILE_NAME};
pub use schema::{ModelUsage, PersistedState, MAX_RECENT_MODELS};
pub use store::StateStore;
