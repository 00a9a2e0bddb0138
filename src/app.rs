use std::fmt;
use std::sync::Arc;

use opencode_api::events::{describe_error, ServerEvent};
use opencode_api::types::{
    Agent, MessageInfo, MessageTime, MessageWithParts, Part, PartKind, Session, UserMessage,
};
use opencode_api::{ChatRequest, InitRequest, PartInput, SummarizeRequest};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tui_state::PersistedState;

use crate::compaction::CompactionSlot;
use crate::config::UiConfig;
use crate::ids::{now_millis, IdGenerator, IdPrefix};
use crate::resolver::{find_by_ids, ModelSelection, ProviderSnapshot, ResolutionSource};

pub type Message = MessageWithParts;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub mime: String,
    pub filename: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub files: Vec<FileAttachment>,
}

impl Prompt {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            files: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.files.is_empty()
    }
}

/// Actions requested by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    CycleAgent {
        forward: bool,
    },
    SubmitPrompt(Prompt),
    Cancel,
    CompactSession,
    SelectModel {
        provider_id: String,
        model_id: String,
    },
    NewSession,
    /// Starts a fresh session that analyzes the project.
    InitializeProject,
    /// Deletes the given session, or the current one.
    DeleteSession {
        session_id: Option<String>,
    },
    SessionLoaded {
        session: Session,
        messages: Vec<Message>,
    },
    Quit,
}

/// Outbound request kinds, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateSession,
    SendChat,
    Abort,
    Summarize,
    LoadSession,
    InitProject,
    DeleteSession,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::CreateSession => "create session",
            Self::SendChat => "send message",
            Self::Abort => "abort session",
            Self::Summarize => "compact session",
            Self::LoadSession => "load session",
            Self::InitProject => "initialize project",
            Self::DeleteSession => "delete session",
        };
        f.write_str(label)
    }
}

/// Everything the reducer consumes, in receipt order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Command(UserCommand),
    Server(ServerEvent),
    RequestFailed { operation: Operation, message: String },
    StreamFailed(String),
    CompactionFinished { generation: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Error,
}

/// User-visible notifications produced by the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    SessionCreated(Session),
    Toast { level: ToastLevel, message: String },
    StreamClosed(String),
}

/// Side effects available to the reducer.
///
/// `create_session` is the only call the reducer waits on. Every other
/// request runs in the background and reports back through [`AppEvent`]s.
pub trait HostOps {
    fn create_session(&mut self) -> Result<Session, String>;
    fn send_chat(&mut self, session_id: &str, request: ChatRequest);
    fn abort_session(&mut self, session_id: &str);
    fn init_project(&mut self, session_id: &str, request: InitRequest);
    fn delete_session(&mut self, session_id: &str);
    fn summarize_session(
        &mut self,
        session_id: &str,
        request: SummarizeRequest,
        generation: u64,
        cancel: CancellationToken,
    );
    fn persist_state(&mut self, state: &PersistedState);
    fn request_render(&mut self);
    fn request_stop(&mut self);
}

/// Inputs for [`App::new`], normally produced by bootstrap.
#[derive(Debug, Clone)]
pub struct AppInit {
    pub snapshot: Arc<ProviderSnapshot>,
    pub agents: Vec<Agent>,
    pub agent_index: usize,
    pub selection: ModelSelection,
    pub state: PersistedState,
    pub ui: UiConfig,
    pub sessions: Vec<Session>,
}

#[derive(Debug)]
pub struct App {
    snapshot: Arc<ProviderSnapshot>,
    agents: Vec<Agent>,
    agent_index: usize,
    selection: ModelSelection,
    session: Option<Session>,
    sessions: Vec<Session>,
    messages: Vec<Message>,
    compaction: CompactionSlot,
    state: PersistedState,
    ui: UiConfig,
    ids: IdGenerator,
    notices: Vec<Notice>,
    pub should_exit: bool,
}

impl App {
    pub fn new(init: AppInit) -> Self {
        let agent_index = if init.agent_index < init.agents.len() {
            init.agent_index
        } else {
            0
        };
        Self {
            snapshot: init.snapshot,
            agents: init.agents,
            agent_index,
            selection: init.selection,
            session: None,
            sessions: init.sessions,
            messages: Vec::new(),
            compaction: CompactionSlot::default(),
            state: init.state,
            ui: init.ui,
            ids: IdGenerator::new(),
            notices: Vec::new(),
            should_exit: false,
        }
    }

    pub fn snapshot(&self) -> &ProviderSnapshot {
        &self.snapshot
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent_index(&self) -> usize {
        self.agent_index
    }

    pub fn current_agent(&self) -> Option<&Agent> {
        self.agents.get(self.agent_index)
    }

    /// Name sent with chat requests; falls back to the persisted agent.
    pub fn agent_name(&self) -> &str {
        self.current_agent()
            .map(|agent| agent.name.as_str())
            .unwrap_or(self.state.agent.as_str())
    }

    pub fn selection(&self) -> ModelSelection {
        self.selection
    }

    /// `(provider id, model id)` of the current selection.
    pub fn selected_ids(&self) -> Option<(&str, &str)> {
        self.snapshot
            .get(self.selection)
            .map(|(provider, model)| (provider.id.as_str(), model.id.as_str()))
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn state(&self) -> &PersistedState {
        &self.state
    }

    pub fn ui(&self) -> &UiConfig {
        &self.ui
    }

    pub fn compaction_active(&self) -> bool {
        self.compaction.is_active()
    }

    pub fn compaction_generation(&self) -> Option<u64> {
        self.compaction.active_generation()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// True while the latest message still waits on the assistant: an
    /// assistant message without a completion time, or a user message with
    /// no reply yet.
    pub fn is_busy(&self) -> bool {
        match self.messages.last().map(|message| &message.info) {
            None => false,
            Some(MessageInfo::Assistant(assistant)) => assistant.time.completed.is_none(),
            Some(MessageInfo::User(_)) => true,
        }
    }

    pub fn handle_event<H: HostOps>(&mut self, event: AppEvent, host: &mut H) {
        match event {
            AppEvent::Command(command) => self.handle_command(command, host),
            AppEvent::Server(event) => self.on_server_event(event, host),
            AppEvent::RequestFailed { operation, message } => {
                self.on_request_failed(operation, &message, host)
            }
            AppEvent::StreamFailed(message) => self.on_stream_failed(message, host),
            AppEvent::CompactionFinished { generation } => {
                self.on_compaction_finished(generation, host)
            }
        }
    }

    pub fn handle_command<H: HostOps>(&mut self, command: UserCommand, host: &mut H) {
        match command {
            UserCommand::CycleAgent { forward } => self.on_cycle_agent(forward, host),
            UserCommand::SubmitPrompt(prompt) => self.on_submit(prompt, host),
            UserCommand::Cancel => self.on_cancel(host),
            UserCommand::CompactSession => self.on_compact(host),
            UserCommand::SelectModel {
                provider_id,
                model_id,
            } => self.on_select_model(&provider_id, &model_id, host),
            UserCommand::NewSession => self.on_new_session(host),
            UserCommand::InitializeProject => self.on_init_project(host),
            UserCommand::DeleteSession { session_id } => {
                self.on_delete_session(session_id, host)
            }
            UserCommand::SessionLoaded { session, messages } => {
                self.on_session_loaded(session, messages, host)
            }
            UserCommand::Quit => self.on_quit(host),
        }
    }

    pub fn on_cycle_agent<H: HostOps>(&mut self, forward: bool, host: &mut H) {
        let len = self.agents.len();
        if len == 0 {
            return;
        }

        let mut index = self.agent_index;
        let mut next = None;
        for _ in 0..len {
            index = if forward {
                (index + 1) % len
            } else {
                (index + len - 1) % len
            };
            if !self.agents[index].is_subagent() {
                next = Some(index);
                break;
            }
        }
        let Some(index) = next else {
            debug!("every agent is a subagent; keeping current agent");
            return;
        };

        self.agent_index = index;
        let agent = &self.agents[index];
        let declared = agent
            .model
            .as_ref()
            .map(|model| (model.provider_id.as_str(), model.model_id.as_str()))
            .or_else(|| {
                self.state
                    .agent_model
                    .get(&agent.name)
                    .map(|usage| (usage.provider_id.as_str(), usage.model_id.as_str()))
            });
        if let Some(pair) = declared.and_then(|(provider_id, model_id)| {
            find_by_ids(&self.snapshot, provider_id, model_id)
        }) {
            self.selection = ModelSelection {
                provider_index: pair.0,
                model_index: pair.1,
                source: ResolutionSource::Agent,
            };
        }

        let name = agent.name.clone();
        info!(agent = %name, "switched agent");
        self.state.agent = name;
        self.state.sync_legacy_selection();
        host.persist_state(&self.state);
        host.request_render();
    }

    pub fn on_submit<H: HostOps>(&mut self, prompt: Prompt, host: &mut H) {
        if prompt.is_empty() {
            return;
        }

        let existing = self.session.as_ref().map(|session| session.id.clone());
        let Some(session_id) = existing.or_else(|| self.start_session(host)) else {
            return;
        };

        let Some(usage) = self.snapshot.usage(self.selection) else {
            self.push_toast(ToastLevel::Error, "no model selected".to_string());
            host.request_render();
            return;
        };

        let message_id = self.ids.ascending(IdPrefix::Message);
        let inputs = self.prompt_parts(&prompt);
        let parts = inputs
            .iter()
            .map(|input| local_part(input, &session_id, &message_id))
            .collect();
        self.insert_message(Message {
            info: MessageInfo::User(UserMessage {
                id: message_id.clone(),
                session_id: session_id.clone(),
                time: MessageTime {
                    created: now_millis(),
                    completed: None,
                },
            }),
            parts,
        });

        let request = ChatRequest {
            message_id,
            provider_id: usage.provider_id.clone(),
            model_id: usage.model_id.clone(),
            agent: self.agent_name().to_string(),
            parts: inputs,
        };
        host.send_chat(&session_id, request);
        host.request_render();
    }

    /// Creates a new session and asks the agent to initialize the project in
    /// it. Any current session is replaced.
    pub fn on_init_project<H: HostOps>(&mut self, host: &mut H) {
        let Some(usage) = self.snapshot.usage(self.selection) else {
            self.push_toast(ToastLevel::Error, "no model selected".to_string());
            host.request_render();
            return;
        };

        self.compaction.cancel();
        self.session = None;
        self.messages.clear();
        let Some(session_id) = self.start_session(host) else {
            return;
        };

        info!(session = %session_id, "initializing project");
        host.init_project(
            &session_id,
            InitRequest {
                message_id: self.ids.ascending(IdPrefix::Message),
                provider_id: usage.provider_id,
                model_id: usage.model_id,
            },
        );
        host.request_render();
    }

    /// Asks the server to delete a session. The view changes once the
    /// `session.deleted` event arrives.
    pub fn on_delete_session<H: HostOps>(&mut self, session_id: Option<String>, host: &mut H) {
        let target =
            session_id.or_else(|| self.session.as_ref().map(|session| session.id.clone()));
        let Some(target) = target else {
            debug!("no session to delete");
            return;
        };
        info!(session = %target, "deleting session");
        host.delete_session(&target);
    }

    pub fn on_cancel<H: HostOps>(&mut self, host: &mut H) {
        if self.compaction.cancel() {
            debug!("cancelled running compaction");
        }
        if let Some(session) = &self.session {
            host.abort_session(&session.id);
        }
        host.request_render();
    }

    pub fn on_compact<H: HostOps>(&mut self, host: &mut H) {
        let Some(session_id) = self.session.as_ref().map(|session| session.id.clone()) else {
            debug!("no session to compact");
            return;
        };
        let Some(usage) = self.snapshot.usage(self.selection) else {
            return;
        };

        let (generation, token) = self.compaction.start();
        info!(generation, session = %session_id, "compacting session");
        host.summarize_session(
            &session_id,
            SummarizeRequest {
                provider_id: usage.provider_id,
                model_id: usage.model_id,
            },
            generation,
            token,
        );
        host.request_render();
    }

    pub fn on_select_model<H: HostOps>(&mut self, provider_id: &str, model_id: &str, host: &mut H) {
        let Some((provider_index, model_index)) = find_by_ids(&self.snapshot, provider_id, model_id)
        else {
            self.push_toast(
                ToastLevel::Error,
                format!("model not found: {provider_id}/{model_id}"),
            );
            host.request_render();
            return;
        };

        self.selection = ModelSelection {
            provider_index,
            model_index,
            source: ResolutionSource::UserSelected,
        };
        if let Some(usage) = self.snapshot.usage(self.selection) {
            let agent = self.agent_name().to_string();
            self.push_toast(
                ToastLevel::Info,
                format!("using {}/{}", usage.provider_id, usage.model_id),
            );
            self.state.set_agent_model(agent, usage.clone());
            self.state.record_recent(usage);
            self.state.sync_legacy_selection();
        }
        host.persist_state(&self.state);
        host.request_render();
    }

    pub fn on_new_session<H: HostOps>(&mut self, host: &mut H) {
        self.compaction.cancel();
        self.session = None;
        self.messages.clear();
        host.request_render();
    }

    pub fn on_session_loaded<H: HostOps>(
        &mut self,
        session: Session,
        mut messages: Vec<Message>,
        host: &mut H,
    ) {
        self.compaction.cancel();
        messages.sort_by(|left, right| left.info.id().cmp(right.info.id()));
        for message in &mut messages {
            message.parts.sort_by(|left, right| left.id.cmp(&right.id));
        }
        self.upsert_session(session.clone());
        self.session = Some(session);
        self.messages = messages;
        host.request_render();
    }

    pub fn on_quit<H: HostOps>(&mut self, host: &mut H) {
        self.compaction.cancel();
        self.should_exit = true;
        host.persist_state(&self.state);
        host.request_stop();
    }

    pub fn on_request_failed<H: HostOps>(&mut self, operation: Operation, message: &str, host: &mut H) {
        warn!(%operation, error = message, "request failed");
        self.push_toast(ToastLevel::Error, format!("failed to {operation}: {message}"));
        host.request_render();
    }

    pub fn on_stream_failed<H: HostOps>(&mut self, message: String, host: &mut H) {
        warn!(error = %message, "event stream failed");
        self.notices.push(Notice::StreamClosed(message));
        host.request_render();
    }

    pub fn on_compaction_finished<H: HostOps>(&mut self, generation: u64, host: &mut H) {
        if self.compaction.finish(generation) {
            debug!(generation, "compaction finished");
            host.request_render();
        } else {
            debug!(generation, "ignoring stale compaction result");
        }
    }

    pub fn on_server_event<H: HostOps>(&mut self, event: ServerEvent, host: &mut H) {
        let changed = match event {
            ServerEvent::ServerConnected => {
                debug!("server connected");
                false
            }
            ServerEvent::SessionUpdated { info } => {
                if self.session.as_ref().is_some_and(|current| current.id == info.id) {
                    self.session = Some(info.clone());
                }
                self.upsert_session(info);
                true
            }
            ServerEvent::SessionDeleted { info } => self.on_session_deleted(&info.id),
            ServerEvent::SessionIdle { session_id } => {
                debug!(session = %session_id, "session idle");
                false
            }
            ServerEvent::SessionError { session_id, error } => {
                let relevant = match (&session_id, &self.session) {
                    (Some(id), Some(current)) => *id == current.id,
                    (Some(_), None) => false,
                    (None, _) => true,
                };
                if relevant {
                    let message = error
                        .as_ref()
                        .map(describe_error)
                        .unwrap_or_else(|| "session error".to_string());
                    self.push_toast(ToastLevel::Error, message);
                }
                relevant
            }
            ServerEvent::MessageUpdated { info } => self.on_message_updated(info),
            ServerEvent::MessageRemoved {
                session_id,
                message_id,
            } => self.on_message_removed(&session_id, &message_id),
            ServerEvent::MessagePartUpdated { part } => self.on_part_updated(part),
            ServerEvent::MessagePartRemoved {
                session_id,
                message_id,
                part_id,
            } => self.on_part_removed(&session_id, &message_id, &part_id),
            ServerEvent::Unknown { event_type, .. } => {
                debug!(%event_type, "ignoring unknown event");
                false
            }
        };

        if changed {
            host.request_render();
        }
    }

    fn on_session_deleted(&mut self, session_id: &str) -> bool {
        self.sessions.retain(|session| session.id != session_id);
        if self.is_current_session(session_id) {
            info!(session = %session_id, "current session deleted");
            self.compaction.cancel();
            self.session = None;
            self.messages.clear();
        }
        true
    }

    fn on_message_updated(&mut self, info: MessageInfo) -> bool {
        if !self.is_current_session(info.session_id()) {
            debug!(message = %info.id(), session = %info.session_id(), "dropping message for another session");
            return false;
        }

        match self.message_position(info.id()) {
            Ok(index) => self.messages[index].info = info,
            Err(index) => self.messages.insert(
                index,
                Message {
                    info,
                    parts: Vec::new(),
                },
            ),
        }
        true
    }

    fn on_message_removed(&mut self, session_id: &str, message_id: &str) -> bool {
        if !self.is_current_session(session_id) {
            return false;
        }
        match self.message_position(message_id) {
            Ok(index) => {
                self.messages.remove(index);
                true
            }
            Err(_) => {
                debug!(message = %message_id, "removal for unknown message");
                false
            }
        }
    }

    fn on_part_updated(&mut self, part: Part) -> bool {
        if !self.is_current_session(&part.session_id) {
            debug!(part = %part.id, session = %part.session_id, "dropping part for another session");
            return false;
        }
        let Ok(message_index) = self.message_position(&part.message_id) else {
            debug!(part = %part.id, message = %part.message_id, "dropping part for unknown message");
            return false;
        };

        let parts = &mut self.messages[message_index].parts;
        match parts.binary_search_by(|existing| existing.id.as_str().cmp(part.id.as_str())) {
            Ok(index) => parts[index] = part,
            Err(index) => parts.insert(index, part),
        }
        true
    }

    fn on_part_removed(&mut self, session_id: &str, message_id: &str, part_id: &str) -> bool {
        if !self.is_current_session(session_id) {
            return false;
        }
        let Ok(message_index) = self.message_position(message_id) else {
            return false;
        };
        let parts = &mut self.messages[message_index].parts;
        match parts.binary_search_by(|existing| existing.id.as_str().cmp(part_id)) {
            Ok(index) => {
                parts.remove(index);
                true
            }
            Err(_) => false,
        }
    }

    fn is_current_session(&self, session_id: &str) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.id == session_id)
    }

    fn message_position(&self, message_id: &str) -> Result<usize, usize> {
        self.messages
            .binary_search_by(|message| message.info.id().cmp(message_id))
    }

    fn insert_message(&mut self, message: Message) {
        match self.message_position(message.info.id()) {
            Ok(index) => self.messages[index] = message,
            Err(index) => self.messages.insert(index, message),
        }
    }

    fn upsert_session(&mut self, session: Session) {
        match self
            .sessions
            .iter()
            .position(|existing| existing.id == session.id)
        {
            Some(index) => self.sessions[index] = session,
            None => self.sessions.insert(0, session),
        }
    }

    fn prompt_parts(&mut self, prompt: &Prompt) -> Vec<PartInput> {
        let mut parts = Vec::with_capacity(1 + prompt.files.len());
        if !prompt.text.trim().is_empty() {
            parts.push(PartInput::Text {
                id: self.ids.ascending(IdPrefix::Part),
                text: prompt.text.clone(),
            });
        }
        for file in &prompt.files {
            parts.push(PartInput::File {
                id: self.ids.ascending(IdPrefix::Part),
                mime: file.mime.clone(),
                filename: file.filename.clone(),
                url: file.url.clone(),
            });
        }
        parts
    }

    /// Creates a session through the host and makes it current. On failure
    /// the error is toasted and `None` returned.
    fn start_session<H: HostOps>(&mut self, host: &mut H) -> Option<String> {
        match host.create_session() {
            Ok(session) => {
                let session_id = session.id.clone();
                self.upsert_session(session.clone());
                self.session = Some(session.clone());
                self.notices.push(Notice::SessionCreated(session));
                Some(session_id)
            }
            Err(message) => {
                warn!(error = %message, "failed to create session");
                self.push_toast(ToastLevel::Error, message);
                host.request_render();
                None
            }
        }
    }

    fn push_toast(&mut self, level: ToastLevel, message: String) {
        self.notices.push(Notice::Toast { level, message });
    }
}

fn local_part(input: &PartInput, session_id: &str, message_id: &str) -> Part {
    let kind = match input {
        PartInput::Text { text, .. } => PartKind::Text {
            text: text.clone(),
            synthetic: false,
        },
        PartInput::File {
            mime,
            filename,
            url,
            ..
        } => PartKind::File {
            mime: mime.clone(),
            filename: filename.clone(),
            url: url.clone(),
        },
    };
    Part {
        id: input.id().to_string(),
        session_id: session_id.to_string(),
        message_id: message_id.to_string(),
        kind,
    }
}
