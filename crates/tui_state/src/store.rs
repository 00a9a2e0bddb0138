use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::StateStoreError;
use crate::paths::state_file_path;
use crate::schema::PersistedState;

/// JSON file holding [`PersistedState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(state_dir: &Path) -> Self {
        Self::new(state_file_path(state_dir))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the state file. `Ok(None)` when it does not exist yet.
    pub fn load(&self) -> Result<Option<PersistedState>, StateStoreError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StateStoreError::io("reading state file", &self.path, source))
            }
        };

        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| StateStoreError::json(&self.path, source))
    }

    /// Loads the state, falling back to defaults when the file is missing or
    /// unreadable. A fallback is written back immediately.
    pub fn load_or_default(&self) -> PersistedState {
        let fallback = match self.load() {
            Ok(Some(state)) => return state,
            Ok(None) => {
                debug!(path = %self.path.display(), "no state file, starting from defaults");
                PersistedState::default()
            }
            Err(error) => {
                warn!(%error, "state file unusable, starting from defaults");
                PersistedState::default()
            }
        };

        if let Err(error) = self.save(&fallback) {
            warn!(%error, "failed to write default state");
        }
        fallback
    }

    /// Writes the state through a temp file and a rename.
    pub fn save(&self, state: &PersistedState) -> Result<(), StateStoreError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| StateStoreError::io("creating state directory", parent, source))?;
        }

        let mut encoded = serde_json::to_vec_pretty(state)
            .map_err(|source| StateStoreError::json_serialize(&self.path, source))?;
        encoded.push(b'\n');

        let temp_path = self.temp_path();
        let mut file = fs::File::create(&temp_path)
            .map_err(|source| StateStoreError::io("creating temp state file", &temp_path, source))?;
        file.write_all(&encoded)
            .and_then(|()| file.sync_all())
            .map_err(|source| StateStoreError::io("writing temp state file", &temp_path, source))?;
        drop(file);

        fs::rename(&temp_path, &self.path)
            .map_err(|source| StateStoreError::io("replacing state file", &self.path, source))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
