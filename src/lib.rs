//! Terminal client core for an opencode server.
//!
//! Data flows one way: [`supervisor`] decodes the server's event stream and
//! hands each event to the reducer ([`app::App`]) over a bounded channel.
//! User commands enter the same channel. The reducer owns all view state and
//! reaches the network only through [`app::HostOps`].
//!
//! # Public API Overview
//! - [`bootstrap::build_app`] merges remote config, providers, agents and the
//!   persisted selection into an [`App`].
//! - [`resolver::resolve`] picks the active provider/model from ranked signals.
//! - [`event_loop::run_event_loop`] drives the reducer.
//! - [`host::RemoteHost`] and [`host::RemoteEventSource`] bind the reducer and
//!   supervisor to an [`opencode_api::OpencodeClient`].

pub mod app;
pub mod bootstrap;
pub mod commands;
pub mod compaction;
pub mod config;
pub mod event_loop;
pub mod host;
pub mod ids;
pub mod logging;
pub mod resolver;
#[cfg(unix)]
pub mod signals;
pub mod supervisor;

pub use crate::app::{App, AppEvent, HostOps, Notice, Operation, Prompt, ToastLevel, UserCommand};
pub use crate::bootstrap::{build_app, BootstrapError, BootstrapInputs, BootstrapOptions};
pub use crate::event_loop::{
    event_queue, run_event_loop, EventReceiver, EventSender, ExitReason, EVENT_QUEUE_CAPACITY,
};
pub use crate::resolver::{resolve, ModelSelection, ModelSignals, ProviderSnapshot, ResolutionSource};
pub use crate::supervisor::{EventSource, StreamSupervisor, SupervisorHandle};
