//! Transport for the opencode server.
//!
//! The crate owns the wire side of the terminal client: the server-sent event
//! decoder, typed server events, REST request/response types, and a
//! `reqwest`-based client. It holds no UI state.

pub mod body;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod payload;
pub mod sse;
pub mod types;
pub mod url;

pub use body::EventStreamBody;
pub use client::{with_cancellation, OpencodeClient};
pub use config::ApiConfig;
pub use error::ApiError;
pub use events::{parse_event, EventParseError, ServerEvent};
pub use payload::{ChatRequest, CreateSessionRequest, InitRequest, PartInput, SummarizeRequest};
pub use sse::{SseDecoder, SseEvent};
pub use crate::url::{normalize_base_url, DEFAULT_BASE_URL};
