//! Production [`HostOps`] backed by the HTTP client and a tokio runtime.
//!
//! Calls arrive on the reducer thread. Background results travel back over
//! the same bounded queue the event stream uses.

use std::io::{self, Read};

use opencode_api::types::Session;
use opencode_api::{
    ApiError, ChatRequest, CreateSessionRequest, EventStreamBody, InitRequest, OpencodeClient,
    SummarizeRequest,
};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tui_state::{PersistedState, StateStore};

use crate::app::{AppEvent, HostOps, Message, Operation};
use crate::event_loop::EventSender;
use crate::supervisor::EventSource;

pub struct RemoteHost {
    client: OpencodeClient,
    runtime: Handle,
    events: EventSender,
    store: StateStore,
    render_requests: u64,
    stop_requested: bool,
}

impl RemoteHost {
    pub fn new(
        client: OpencodeClient,
        runtime: Handle,
        events: EventSender,
        store: StateStore,
    ) -> Self {
        Self {
            client,
            runtime,
            events,
            store,
            render_requests: 0,
            stop_requested: false,
        }
    }

    /// Number of redraws asked for so far. Rendering itself lives outside
    /// this crate.
    pub fn render_requests(&self) -> u64 {
        self.render_requests
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Fetches a session and its messages, blocking the caller.
    pub fn fetch_session(&self, session_id: &str) -> Result<(Session, Vec<Message>), ApiError> {
        self.runtime.block_on(async {
            let sessions = self.client.list_sessions().await?;
            let session = sessions
                .into_iter()
                .find(|session| session.id == session_id)
                .ok_or_else(|| ApiError::Unknown(format!("session {session_id} not found")))?;
            let messages = self.client.list_messages(session_id).await?;
            Ok((session, messages))
        })
    }

    fn spawn_request<F>(&self, operation: Operation, request: F)
    where
        F: std::future::Future<Output = Result<(), ApiError>> + Send + 'static,
    {
        let events = self.events.clone();
        self.runtime.spawn(async move {
            match request.await {
                Ok(()) => debug!(%operation, "request completed"),
                Err(error) if error.is_cancelled() => debug!(%operation, "request cancelled"),
                Err(error) => {
                    deliver(
                        &events,
                        AppEvent::RequestFailed {
                            operation,
                            message: error.to_string(),
                        },
                    )
                    .await
                }
            }
        });
    }
}

impl HostOps for RemoteHost {
    fn create_session(&mut self) -> Result<Session, String> {
        let request = CreateSessionRequest::default();
        match self.runtime.block_on(self.client.create_session(&request)) {
            Ok(session) => {
                info!(session = %session.id, "created session");
                Ok(session)
            }
            Err(error) => Err(format!("failed to {}: {error}", Operation::CreateSession)),
        }
    }

    fn send_chat(&mut self, session_id: &str, request: ChatRequest) {
        let client = self.client.clone();
        let session_id = session_id.to_string();
        self.spawn_request(Operation::SendChat, async move {
            client.send_chat(&session_id, &request).await
        });
    }

    fn abort_session(&mut self, session_id: &str) {
        let client = self.client.clone();
        let session_id = session_id.to_string();
        self.spawn_request(Operation::Abort, async move {
            client.abort_session(&session_id).await
        });
    }

    fn init_project(&mut self, session_id: &str, request: InitRequest) {
        let client = self.client.clone();
        let session_id = session_id.to_string();
        self.spawn_request(Operation::InitProject, async move {
            client.init_session(&session_id, &request).await
        });
    }

    fn delete_session(&mut self, session_id: &str) {
        let client = self.client.clone();
        let session_id = session_id.to_string();
        self.spawn_request(Operation::DeleteSession, async move {
            client.delete_session(&session_id).await
        });
    }

    fn summarize_session(
        &mut self,
        session_id: &str,
        request: SummarizeRequest,
        generation: u64,
        cancel: CancellationToken,
    ) {
        let client = self.client.clone();
        let events = self.events.clone();
        let session_id = session_id.to_string();
        self.runtime.spawn(async move {
            let result = client
                .summarize_session(&session_id, &request, &cancel)
                .await;
            for event in summarize_outcome(result, &cancel, generation) {
                deliver(&events, event).await;
            }
        });
    }

    fn persist_state(&mut self, state: &PersistedState) {
        if let Err(error) = self.store.save(state) {
            warn!(%error, path = %self.store.path().display(), "failed to persist state");
        }
    }

    fn request_render(&mut self) {
        self.render_requests += 1;
    }

    fn request_stop(&mut self) {
        self.stop_requested = true;
    }
}

/// Opens `GET /event` through the client.
pub struct RemoteEventSource {
    client: OpencodeClient,
    runtime: Handle,
}

impl RemoteEventSource {
    pub fn new(client: OpencodeClient, runtime: Handle) -> Self {
        Self { client, runtime }
    }
}

impl EventSource for RemoteEventSource {
    fn connect(&self, cancel: &CancellationToken) -> io::Result<Box<dyn Read + Send>> {
        let response = self
            .runtime
            .block_on(self.client.subscribe_events(cancel))
            .map_err(|error| match error {
                ApiError::Cancelled => io::Error::new(io::ErrorKind::ConnectionAborted, error),
                other => io::Error::other(other),
            })?;
        Ok(Box::new(EventStreamBody::new(
            response,
            self.runtime.clone(),
            cancel.clone(),
        )))
    }
}

/// Events a finished summarize request produces. A failure caused by
/// cancellation, whether reported by the client or seen on the token, is not
/// an error. `CompactionFinished` always comes last.
fn summarize_outcome(
    result: Result<(), ApiError>,
    cancel: &CancellationToken,
    generation: u64,
) -> Vec<AppEvent> {
    let mut events = Vec::with_capacity(2);
    match result {
        Ok(()) => info!(generation, "compaction completed"),
        Err(error) if error.is_cancelled() || cancel.is_cancelled() => {
            debug!(generation, "compaction cancelled")
        }
        Err(error) => events.push(AppEvent::RequestFailed {
            operation: Operation::Summarize,
            message: error.to_string(),
        }),
    }
    events.push(AppEvent::CompactionFinished { generation });
    events
}

async fn deliver(events: &EventSender, event: AppEvent) {
    if events.send(event).await.is_err() {
        debug!("reducer is gone; dropping background result");
    }
}
