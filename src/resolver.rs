//! Provider/model resolution.
//!
//! Resolution walks five ranked sources and stops at the first candidate whose
//! provider and model both exist in the snapshot:
//!
//! 1. command-line override (`providerID/modelID`)
//! 2. configured model (same form)
//! 3. head of the recently-used list
//! 4. legacy flat `provider`/`model` state
//! 5. fallback: [`PREFERRED_PROVIDER`] when it has a usable default, then
//!    every provider in snapshot order
//!
//! A missing provider and a missing model fall through the same way.

use std::collections::BTreeMap;

use opencode_api::types::{Model, Provider, ProvidersResponse};
use tracing::{debug, info};
use tui_state::ModelUsage;

pub const PREFERRED_PROVIDER: &str = "anthropic";

/// Providers and their declared default models, fetched once per process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSnapshot {
    pub providers: Vec<Provider>,
    /// Declared default model id per provider id.
    pub defaults: BTreeMap<String, String>,
}

impl ProviderSnapshot {
    pub fn new(mut providers: Vec<Provider>, defaults: BTreeMap<String, String>) -> Self {
        for provider in &mut providers {
            for model in &mut provider.models {
                if model.provider_id.is_empty() {
                    model.provider_id = provider.id.clone();
                }
            }
        }
        Self {
            providers,
            defaults,
        }
    }

    pub fn from_response(response: ProvidersResponse) -> Self {
        Self::new(response.providers, response.default)
    }

    pub fn is_empty(&self) -> bool {
        self.providers.iter().all(|provider| provider.models.is_empty())
    }

    pub fn provider(&self, index: usize) -> Option<&Provider> {
        self.providers.get(index)
    }

    /// Provider and model behind a selection, if it belongs to this snapshot.
    pub fn get(&self, selection: ModelSelection) -> Option<(&Provider, &Model)> {
        let provider = self.providers.get(selection.provider_index)?;
        let model = provider.models.get(selection.model_index)?;
        Some((provider, model))
    }

    pub fn usage(&self, selection: ModelSelection) -> Option<ModelUsage> {
        self.get(selection)
            .map(|(provider, model)| ModelUsage::new(provider.id.clone(), model.id.clone()))
    }
}

/// Which source produced a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    CommandLine,
    Config,
    RecentlyUsed,
    LegacyState,
    Fallback,
    Agent,
    UserSelected,
}

/// Index pair into a [`ProviderSnapshot`]. Only produced by lookups, so the
/// model always belongs to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSelection {
    pub provider_index: usize,
    pub model_index: usize,
    pub source: ResolutionSource,
}

impl ModelSelection {
    fn from_pair((provider_index, model_index): (usize, usize), source: ResolutionSource) -> Self {
        Self {
            provider_index,
            model_index,
            source,
        }
    }

    /// Same provider and model, ignoring how they were chosen.
    pub fn same_model(&self, other: &ModelSelection) -> bool {
        self.provider_index == other.provider_index && self.model_index == other.model_index
    }
}

/// Inputs to [`resolve`], highest priority first.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelSignals<'a> {
    pub initial_model: Option<&'a str>,
    pub config_model: Option<&'a str>,
    pub recently_used: &'a [ModelUsage],
    pub state_provider_model: Option<(&'a str, &'a str)>,
}

pub fn find_provider(snapshot: &ProviderSnapshot, provider_id: &str) -> Option<usize> {
    snapshot
        .providers
        .iter()
        .position(|provider| provider.id == provider_id)
}

pub fn find_by_ids(
    snapshot: &ProviderSnapshot,
    provider_id: &str,
    model_id: &str,
) -> Option<(usize, usize)> {
    let provider_index = find_provider(snapshot, provider_id)?;
    let model_index = snapshot.providers[provider_index]
        .models
        .iter()
        .position(|model| model.id == model_id)?;
    Some((provider_index, model_index))
}

/// Looks up `providerID/modelID`, splitting on the first `/`.
pub fn find_by_full_id(snapshot: &ProviderSnapshot, full_id: &str) -> Option<(usize, usize)> {
    let (provider_id, model_id) = full_id.split_once('/')?;
    find_by_ids(snapshot, provider_id, model_id)
}

/// Declared default of a provider if it exists, else its first model.
pub fn default_model_index(snapshot: &ProviderSnapshot, provider_index: usize) -> Option<usize> {
    let provider = snapshot.providers.get(provider_index)?;
    let declared = snapshot
        .defaults
        .get(&provider.id)
        .and_then(|model_id| provider.models.iter().position(|model| &model.id == model_id));
    match declared {
        Some(index) => Some(index),
        None if provider.models.is_empty() => None,
        None => Some(0),
    }
}

pub fn resolve(snapshot: &ProviderSnapshot, signals: &ModelSignals<'_>) -> Option<ModelSelection> {
    let selection = resolve_ranked(snapshot, signals)?;
    if let Some((provider, model)) = snapshot.get(selection) {
        info!(
            source = ?selection.source,
            provider = %provider.id,
            model = %model.id,
            "resolved model"
        );
    }
    Some(selection)
}

fn resolve_ranked(snapshot: &ProviderSnapshot, signals: &ModelSignals<'_>) -> Option<ModelSelection> {
    if let Some(full_id) = signals.initial_model {
        match find_by_full_id(snapshot, full_id) {
            Some(pair) => return Some(ModelSelection::from_pair(pair, ResolutionSource::CommandLine)),
            None => debug!(model = full_id, "command-line model not found"),
        }
    }

    if let Some(full_id) = signals.config_model {
        match find_by_full_id(snapshot, full_id) {
            Some(pair) => return Some(ModelSelection::from_pair(pair, ResolutionSource::Config)),
            None => debug!(model = full_id, "configured model not found"),
        }
    }

    if let Some(recent) = signals.recently_used.first() {
        match find_by_ids(snapshot, &recent.provider_id, &recent.model_id) {
            Some(pair) => {
                return Some(ModelSelection::from_pair(pair, ResolutionSource::RecentlyUsed))
            }
            None => debug!(
                provider = %recent.provider_id,
                model = %recent.model_id,
                "recently used model not found"
            ),
        }
    }

    if let Some((provider_id, model_id)) = signals.state_provider_model {
        match find_by_ids(snapshot, provider_id, model_id) {
            Some(pair) => return Some(ModelSelection::from_pair(pair, ResolutionSource::LegacyState)),
            None => debug!(provider = provider_id, model = model_id, "saved model not found"),
        }
    }

    fallback(snapshot)
}

fn fallback(snapshot: &ProviderSnapshot) -> Option<ModelSelection> {
    if let Some(provider_index) = find_provider(snapshot, PREFERRED_PROVIDER) {
        if let Some(model_index) = default_model_index(snapshot, provider_index) {
            return Some(ModelSelection::from_pair(
                (provider_index, model_index),
                ResolutionSource::Fallback,
            ));
        }
    }

    (0..snapshot.providers.len()).find_map(|provider_index| {
        default_model_index(snapshot, provider_index).map(|model_index| {
            ModelSelection::from_pair((provider_index, model_index), ResolutionSource::Fallback)
        })
    })
}
