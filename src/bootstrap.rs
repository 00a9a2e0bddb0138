//! Startup: fetch remote state, merge it with persisted selection state, and
//! build the initial [`App`].

use std::sync::Arc;

use opencode_api::types::{Agent, Config, Session};
use opencode_api::{ApiError, OpencodeClient};
use thiserror::Error;
use tracing::{info, warn};
use tui_state::{ModelUsage, PersistedState};

use crate::app::{App, AppInit};
use crate::config::{UiConfig, DEFAULT_LEADER, DEFAULT_THEME};
use crate::resolver::{resolve, ModelSignals, ProviderSnapshot};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to fetch {what}: {source}")]
    Fetch {
        what: &'static str,
        #[source]
        source: ApiError,
    },
    #[error("no usable model: configure a provider on the server or pass --model provider/model")]
    NoModelAvailable,
}

/// Remote state needed to start.
#[derive(Debug, Clone)]
pub struct BootstrapInputs {
    pub config: Config,
    pub providers: ProviderSnapshot,
    pub agents: Vec<Agent>,
    pub sessions: Vec<Session>,
}

#[derive(Debug, Clone, Default)]
pub struct BootstrapOptions {
    /// `--model provider/model`.
    pub initial_model: Option<String>,
    /// `--agent name`.
    pub initial_agent: Option<String>,
    /// `OPENCODE_THEME`.
    pub theme_override: Option<String>,
}

pub async fn fetch_inputs(client: &OpencodeClient) -> Result<BootstrapInputs, BootstrapError> {
    let fetch = |what: &'static str| move |source: ApiError| BootstrapError::Fetch { what, source };
    let (config, providers, agents, sessions) = tokio::try_join!(
        async { client.get_config().await.map_err(fetch("config")) },
        async { client.list_providers().await.map_err(fetch("providers")) },
        async { client.list_agents().await.map_err(fetch("agents")) },
        async { client.list_sessions().await.map_err(fetch("sessions")) },
    )?;
    Ok(BootstrapInputs {
        config,
        providers: ProviderSnapshot::from_response(providers),
        agents,
        sessions,
    })
}

/// Builds the initial [`App`]. Fails only when no model can be resolved.
pub fn build_app(
    inputs: BootstrapInputs,
    mut state: PersistedState,
    options: &BootstrapOptions,
) -> Result<App, BootstrapError> {
    let BootstrapInputs {
        config,
        providers,
        agents,
        sessions,
    } = inputs;

    let ui = ui_config(&config, &state, options);
    state.theme = ui.theme.clone();

    let agent_index = select_agent(&agents, &state, options.initial_agent.as_deref());
    if let Some(agent) = agents.get(agent_index) {
        state.agent = agent.name.clone();
        if let Some(model) = &agent.model {
            state.set_agent_model(
                agent.name.clone(),
                ModelUsage::new(model.provider_id.clone(), model.model_id.clone()),
            );
        }
    }
    state.sync_legacy_selection();

    let signals = ModelSignals {
        initial_model: options.initial_model.as_deref(),
        config_model: config.model.as_deref(),
        recently_used: &state.recently_used_models,
        state_provider_model: state.legacy_selection(),
    };
    let selection = resolve(&providers, &signals).ok_or(BootstrapError::NoModelAvailable)?;

    info!(
        agent = %state.agent,
        agents = agents.len(),
        providers = providers.providers.len(),
        sessions = sessions.len(),
        "bootstrap complete"
    );

    Ok(App::new(AppInit {
        snapshot: Arc::new(providers),
        agents,
        agent_index,
        selection,
        state,
        ui,
        sessions,
    }))
}

fn ui_config(config: &Config, state: &PersistedState, options: &BootstrapOptions) -> UiConfig {
    let theme = options
        .theme_override
        .clone()
        .or_else(|| config.theme.clone())
        .or_else(|| (!state.theme.is_empty()).then(|| state.theme.clone()))
        .unwrap_or_else(|| DEFAULT_THEME.to_string());
    let leader = config
        .keybinds
        .as_ref()
        .and_then(|keybinds| keybinds.leader.clone())
        .unwrap_or_else(|| DEFAULT_LEADER.to_string());
    UiConfig { theme, leader }
}

/// First selectable agent, then the saved agent, then `--agent`, later
/// choices winning when they name a selectable agent.
fn select_agent(agents: &[Agent], state: &PersistedState, requested: Option<&str>) -> usize {
    let selectable = |name: &str| {
        agents
            .iter()
            .position(|agent| agent.name == name && !agent.is_subagent())
    };

    let mut index = agents
        .iter()
        .position(|agent| !agent.is_subagent())
        .unwrap_or(0);
    if let Some(saved) = selectable(&state.agent) {
        index = saved;
    }
    if let Some(name) = requested {
        match selectable(name) {
            Some(found) => index = found,
            None => warn!(agent = name, "requested agent not found"),
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use assert_matches::assert_matches;
    use opencode_api::types::{AgentMode, Keybinds, Model, ModelRef, Provider};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::resolver::ResolutionSource;

    fn provider(id: &str, models: &[&str]) -> Provider {
        Provider {
            id: id.to_string(),
            name: id.to_string(),
            models: models
                .iter()
                .map(|model| Model {
                    id: model.to_string(),
                    name: model.to_string(),
                    provider_id: String::new(),
                })
                .collect(),
        }
    }

    fn agent(name: &str, mode: AgentMode, model: Option<(&str, &str)>) -> Agent {
        Agent {
            name: name.to_string(),
            mode,
            model: model.map(|(provider_id, model_id)| ModelRef {
                provider_id: provider_id.to_string(),
                model_id: model_id.to_string(),
            }),
        }
    }

    fn inputs(agents: Vec<Agent>) -> BootstrapInputs {
        BootstrapInputs {
            config: Config::default(),
            providers: ProviderSnapshot::new(
                vec![provider("openai", &["gpt-4", "gpt-5"]), provider("anthropic", &["claude"])],
                BTreeMap::new(),
            ),
            agents,
            sessions: Vec::new(),
        }
    }

    #[test]
    fn first_primary_agent_is_selected_by_default() {
        let agents = vec![
            agent("general", AgentMode::Subagent, None),
            agent("build", AgentMode::Primary, None),
        ];
        let app = build_app(inputs(agents), PersistedState::default(), &BootstrapOptions::default())
            .expect("app");
        assert_eq!(app.agent_name(), "build");
        assert_eq!(app.state().agent, "build");
    }

    #[test]
    fn requested_agent_wins_over_saved_agent() {
        let agents = vec![
            agent("build", AgentMode::Primary, None),
            agent("plan", AgentMode::Primary, None),
            agent("docs", AgentMode::All, None),
        ];
        let state = PersistedState {
            agent: "plan".to_string(),
            ..PersistedState::default()
        };
        let options = BootstrapOptions {
            initial_agent: Some("docs".to_string()),
            ..BootstrapOptions::default()
        };
        let app = build_app(inputs(agents), state, &options).expect("app");
        assert_eq!(app.agent_name(), "docs");
    }

    #[test]
    fn agent_default_model_feeds_legacy_selection() {
        let agents = vec![agent("build", AgentMode::Primary, Some(("openai", "gpt-5")))];
        let app = build_app(inputs(agents), PersistedState::default(), &BootstrapOptions::default())
            .expect("app");
        assert_eq!(app.selected_ids(), Some(("openai", "gpt-5")));
        assert_eq!(app.selection().source, ResolutionSource::LegacyState);
        assert_eq!(app.state().provider, "openai");
    }

    #[test]
    fn command_line_model_beats_everything() {
        let agents = vec![agent("build", AgentMode::Primary, Some(("openai", "gpt-5")))];
        let options = BootstrapOptions {
            initial_model: Some("anthropic/claude".to_string()),
            ..BootstrapOptions::default()
        };
        let app = build_app(inputs(agents), PersistedState::default(), &options).expect("app");
        assert_eq!(app.selected_ids(), Some(("anthropic", "claude")));
        assert_eq!(app.selection().source, ResolutionSource::CommandLine);
    }

    #[test]
    fn empty_provider_list_is_fatal() {
        let inputs = BootstrapInputs {
            config: Config::default(),
            providers: ProviderSnapshot::new(Vec::new(), BTreeMap::new()),
            agents: Vec::new(),
            sessions: Vec::new(),
        };
        let result = build_app(inputs, PersistedState::default(), &BootstrapOptions::default());
        assert_matches!(result, Err(BootstrapError::NoModelAvailable));
    }

    #[test]
    fn theme_override_and_leader_come_from_env_and_config() {
        let mut inputs = inputs(Vec::new());
        inputs.config = Config {
            model: None,
            theme: Some("tokyonight".to_string()),
            keybinds: Some(Keybinds {
                leader: Some("ctrl+a".to_string()),
            }),
        };
        let options = BootstrapOptions {
            theme_override: Some("gruvbox".to_string()),
            ..BootstrapOptions::default()
        };
        let app = build_app(inputs, PersistedState::default(), &options).expect("app");
        assert_eq!(app.ui().theme, "gruvbox");
        assert_eq!(app.ui().leader, "ctrl+a");
        assert_eq!(app.state().theme, "gruvbox");
    }

    #[test]
    fn theme_falls_back_to_saved_then_default() {
        let state = PersistedState {
            theme: "saved".to_string(),
            ..PersistedState::default()
        };
        let app = build_app(inputs(Vec::new()), state, &BootstrapOptions::default()).expect("app");
        assert_eq!(app.ui().theme, "saved");

        let app = build_app(
            inputs(Vec::new()),
            PersistedState::default(),
            &BootstrapOptions::default(),
        )
        .expect("app");
        assert_eq!(app.ui().theme, DEFAULT_THEME);
        assert_eq!(app.ui().leader, DEFAULT_LEADER);
    }
}
