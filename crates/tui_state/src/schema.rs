use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Most recently used models kept in [`PersistedState::recently_used_models`].
pub const MAX_RECENT_MODELS: usize = 10;

/// A provider/model pair as persisted on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelUsage {
    #[serde(rename = "providerID")]
    pub provider_id: String,
    #[serde(rename = "modelID")]
    pub model_id: String,
}

impl ModelUsage {
    pub fn new(provider_id: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            model_id: model_id.into(),
        }
    }
}

/// Selection state carried across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub theme: String,
    /// Legacy flat selection, kept in sync with `agent_model[agent]`.
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(rename = "agentModel", default)]
    pub agent_model: BTreeMap<String, ModelUsage>,
    /// Most recent first, at most [`MAX_RECENT_MODELS`] entries, no duplicates.
    #[serde(rename = "recentlyUsedModels", default)]
    pub recently_used_models: Vec<ModelUsage>,
}

impl PersistedState {
    /// Copies `agent_model[agent]` into the legacy `provider`/`model` fields.
    /// Returns whether anything changed.
    pub fn sync_legacy_selection(&mut self) -> bool {
        let Some(selection) = self.agent_model.get(&self.agent) else {
            return false;
        };
        if self.provider == selection.provider_id && self.model == selection.model_id {
            return false;
        }
        self.provider = selection.provider_id.clone();
        self.model = selection.model_id.clone();
        true
    }

    /// Moves `usage` to the head of the recency list, dropping the oldest
    /// entries past the cap.
    pub fn record_recent(&mut self, usage: ModelUsage) {
        self.recently_used_models.retain(|existing| existing != &usage);
        self.recently_used_models.insert(0, usage);
        self.recently_used_models.truncate(MAX_RECENT_MODELS);
    }

    pub fn most_recent(&self) -> Option<&ModelUsage> {
        self.recently_used_models.first()
    }

    pub fn set_agent_model(&mut self, agent: impl Into<String>, usage: ModelUsage) {
        self.agent_model.insert(agent.into(), usage);
    }

    /// Legacy flat selection when both halves are present.
    pub fn legacy_selection(&self) -> Option<(&str, &str)> {
        if self.provider.is_empty() || self.model.is_empty() {
            None
        } else {
            Some((self.provider.as_str(), self.model.as_str()))
        }
    }
}
