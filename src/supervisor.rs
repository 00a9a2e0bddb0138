use std::io::{self, Read};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use opencode_api::events::{EventParseError, ServerEvent};
use opencode_api::sse::SseDecoder;
use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::app::AppEvent;
use crate::event_loop::EventSender;

const THREAD_NAME: &str = "opencode-event-stream";

/// Opens the raw event stream.
///
/// The returned reader must fail or end promptly once `cancel` fires.
pub trait EventSource: Send + Sync {
    fn connect(&self, cancel: &CancellationToken) -> io::Result<Box<dyn Read + Send>>;
}

/// Background reader that feeds decoded server events to the reducer.
pub struct StreamSupervisor;

impl StreamSupervisor {
    pub fn spawn(source: Arc<dyn EventSource>, sink: EventSender) -> io::Result<SupervisorHandle> {
        let cancel = CancellationToken::new();
        let forwarder = Forwarder {
            runtime: Builder::new_current_thread().build()?,
            sink,
            cancel: cancel.clone(),
        };
        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run_stream(source, forwarder))?;
        Ok(SupervisorHandle {
            cancel,
            thread: Some(thread),
        })
    }
}

#[derive(Debug)]
pub struct SupervisorHandle {
    cancel: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl SupervisorHandle {
    /// Cancels the stream and waits for the reader thread to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("event stream thread panicked during shutdown");
            }
        }
    }
}

impl Drop for SupervisorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Hands events to the reducer queue. Owns a small runtime so a send can wait
/// for queue space and still give way to cancellation.
struct Forwarder {
    runtime: Runtime,
    sink: EventSender,
    cancel: CancellationToken,
}

impl Forwarder {
    /// Returns `false` when the event was not delivered.
    fn forward(&self, event: AppEvent) -> bool {
        self.runtime.block_on(async {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => false,
                sent = self.sink.send(event) => {
                    if sent.is_err() {
                        debug!("reducer is gone; stopping event stream");
                    }
                    sent.is_ok()
                }
            }
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

fn run_stream(source: Arc<dyn EventSource>, forwarder: Forwarder) {
    let outcome = catch_unwind(AssertUnwindSafe(|| read_events(&*source, &forwarder)));

    let failure = match outcome {
        Ok(Ok(())) => return,
        Ok(Err(message)) => message,
        Err(_) => "event stream reader panicked".to_string(),
    };

    if forwarder.is_cancelled() {
        debug!(%failure, "event stream stopped after cancellation");
        return;
    }
    error!(%failure, "event stream failed");
    forwarder.forward(AppEvent::StreamFailed(failure));
}

/// Runs until end of stream, cancellation, or a disconnected reducer.
///
/// A read failure or a payload that is not JSON ends the stream; `Err`
/// carries the message to surface. A known event type whose properties do not
/// decode is dropped and the stream goes on.
fn read_events(source: &dyn EventSource, forwarder: &Forwarder) -> Result<(), String> {
    let reader = source
        .connect(&forwarder.cancel)
        .map_err(|error| format!("failed to connect to event stream: {error}"))?;
    info!("event stream connected");

    let mut decoder = SseDecoder::new(reader);
    while decoder.advance() {
        let event = decoder.take_current();
        match ServerEvent::from_sse(&event) {
            Ok(server_event) => {
                if !forwarder.forward(AppEvent::Server(server_event)) {
                    decoder.close();
                    return Ok(());
                }
            }
            Err(error @ EventParseError::Properties { .. }) => {
                warn!(%error, "dropping event with undecodable properties");
            }
            Err(error) => {
                warn!(%error, kind = event.kind(), "malformed event payload");
                decoder.close();
                return Err(format!("malformed event: {error}"));
            }
        }
    }

    if forwarder.is_cancelled() {
        return Ok(());
    }
    if let Some(error) = decoder.last_error() {
        return Err(format!("event stream read failed: {error}"));
    }
    info!("event stream closed by server");
    Ok(())
}
