#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use opencode_api::types::{
    Agent, AgentMode, AssistantMessage, MessageInfo, MessageTime, Model, ModelRef, Part, PartKind,
    Provider, Session, SessionTime,
};
use opencode_api::{ChatRequest, InitRequest, SummarizeRequest};
use opencode_tui::app::{App, AppInit, HostOps};
use opencode_tui::config::UiConfig;
use opencode_tui::resolver::{resolve, ModelSignals, ProviderSnapshot};
use tokio_util::sync::CancellationToken;
use tui_state::PersistedState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizeCall {
    pub session_id: String,
    pub request: SummarizeRequest,
    pub generation: u64,
}

/// Records every host call; session creation is scripted.
#[derive(Default)]
pub struct HostSpy {
    pub next_session: Option<Result<Session, String>>,
    pub create_calls: usize,
    pub chats: Vec<(String, ChatRequest)>,
    pub aborts: Vec<String>,
    pub inits: Vec<(String, InitRequest)>,
    pub deletions: Vec<String>,
    pub summaries: Vec<SummarizeCall>,
    pub summary_tokens: Vec<CancellationToken>,
    pub persisted: Vec<PersistedState>,
    pub render_requests: usize,
    pub stop_requests: usize,
}

impl HostSpy {
    pub fn creating(session: Session) -> Self {
        Self {
            next_session: Some(Ok(session)),
            ..Self::default()
        }
    }

    pub fn failing_create(message: &str) -> Self {
        Self {
            next_session: Some(Err(message.to_string())),
            ..Self::default()
        }
    }
}

impl HostOps for HostSpy {
    fn create_session(&mut self) -> Result<Session, String> {
        self.create_calls += 1;
        self.next_session
            .take()
            .unwrap_or_else(|| Err("no session scripted".to_string()))
    }

    fn send_chat(&mut self, session_id: &str, request: ChatRequest) {
        self.chats.push((session_id.to_string(), request));
    }

    fn abort_session(&mut self, session_id: &str) {
        self.aborts.push(session_id.to_string());
    }

    fn init_project(&mut self, session_id: &str, request: InitRequest) {
        self.inits.push((session_id.to_string(), request));
    }

    fn delete_session(&mut self, session_id: &str) {
        self.deletions.push(session_id.to_string());
    }

    fn summarize_session(
        &mut self,
        session_id: &str,
        request: SummarizeRequest,
        generation: u64,
        cancel: CancellationToken,
    ) {
        self.summaries.push(SummarizeCall {
            session_id: session_id.to_string(),
            request,
            generation,
        });
        self.summary_tokens.push(cancel);
    }

    fn persist_state(&mut self, state: &PersistedState) {
        self.persisted.push(state.clone());
    }

    fn request_render(&mut self) {
        self.render_requests += 1;
    }

    fn request_stop(&mut self) {
        self.stop_requests += 1;
    }
}

pub fn provider(id: &str, models: &[&str]) -> Provider {
    Provider {
        id: id.to_string(),
        name: id.to_string(),
        models: models
            .iter()
            .map(|model| Model {
                id: model.to_string(),
                name: model.to_string(),
                provider_id: id.to_string(),
            })
            .collect(),
    }
}

pub fn snapshot(providers: Vec<Provider>, defaults: &[(&str, &str)]) -> ProviderSnapshot {
    let defaults = defaults
        .iter()
        .map(|(provider, model)| (provider.to_string(), model.to_string()))
        .collect::<BTreeMap<_, _>>();
    ProviderSnapshot::new(providers, defaults)
}

pub fn agent(name: &str, mode: AgentMode) -> Agent {
    Agent {
        name: name.to_string(),
        mode,
        model: None,
    }
}

pub fn agent_with_model(name: &str, provider_id: &str, model_id: &str) -> Agent {
    Agent {
        name: name.to_string(),
        mode: AgentMode::Primary,
        model: Some(ModelRef {
            provider_id: provider_id.to_string(),
            model_id: model_id.to_string(),
        }),
    }
}

pub fn session(id: &str) -> Session {
    Session {
        id: id.to_string(),
        title: format!("session {id}"),
        parent_id: None,
        time: SessionTime::default(),
    }
}

pub fn assistant(id: &str, session_id: &str, completed: Option<u64>) -> MessageInfo {
    MessageInfo::Assistant(AssistantMessage {
        id: id.to_string(),
        session_id: session_id.to_string(),
        time: MessageTime {
            created: 1,
            completed,
        },
        provider_id: "openai".to_string(),
        model_id: "gpt-4".to_string(),
        error: None,
    })
}

pub fn text_part(id: &str, session_id: &str, message_id: &str, text: &str) -> Part {
    Part {
        id: id.to_string(),
        session_id: session_id.to_string(),
        message_id: message_id.to_string(),
        kind: PartKind::Text {
            text: text.to_string(),
            synthetic: false,
        },
    }
}

/// App over `openai/{gpt-4,gpt-5}` and `anthropic/claude` with agents
/// `build`, `general` (subagent) and `plan`.
pub fn default_app() -> App {
    app_with(
        snapshot(
            vec![provider("openai", &["gpt-4", "gpt-5"]), provider("anthropic", &["claude"])],
            &[],
        ),
        vec![
            agent("build", AgentMode::Primary),
            agent("general", AgentMode::Subagent),
            agent("plan", AgentMode::Primary),
        ],
        PersistedState::default(),
    )
}

pub fn app_with(snapshot: ProviderSnapshot, agents: Vec<Agent>, state: PersistedState) -> App {
    let selection = resolve(
        &snapshot,
        &ModelSignals {
            recently_used: &state.recently_used_models,
            state_provider_model: state.legacy_selection(),
            ..ModelSignals::default()
        },
    )
    .expect("fixture snapshot resolves a model");
    App::new(AppInit {
        snapshot: Arc::new(snapshot),
        agents,
        agent_index: 0,
        selection,
        state,
        ui: UiConfig::default(),
        sessions: Vec::new(),
    })
}
