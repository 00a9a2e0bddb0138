use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::sse::SseEvent;
use crate::types::{MessageInfo, Part, Session};

pub const EVENT_SERVER_CONNECTED: &str = "server.connected";
pub const EVENT_SESSION_UPDATED: &str = "session.updated";
pub const EVENT_SESSION_DELETED: &str = "session.deleted";
pub const EVENT_SESSION_IDLE: &str = "session.idle";
pub const EVENT_SESSION_ERROR: &str = "session.error";
pub const EVENT_MESSAGE_UPDATED: &str = "message.updated";
pub const EVENT_MESSAGE_REMOVED: &str = "message.removed";
pub const EVENT_MESSAGE_PART_UPDATED: &str = "message.part.updated";
pub const EVENT_MESSAGE_PART_REMOVED: &str = "message.part.removed";

/// Typed body of one streamed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    ServerConnected,
    SessionUpdated {
        info: Session,
    },
    SessionDeleted {
        info: Session,
    },
    SessionIdle {
        session_id: String,
    },
    SessionError {
        session_id: Option<String>,
        error: Option<Value>,
    },
    MessageUpdated {
        info: MessageInfo,
    },
    MessageRemoved {
        session_id: String,
        message_id: String,
    },
    MessagePartUpdated {
        part: Part,
    },
    MessagePartRemoved {
        session_id: String,
        message_id: String,
        part_id: String,
    },
    /// Event type outside the known catalogue, kept verbatim.
    Unknown {
        event_type: String,
        payload: Value,
    },
}

impl ServerEvent {
    pub fn event_type(&self) -> &str {
        match self {
            Self::ServerConnected => EVENT_SERVER_CONNECTED,
            Self::SessionUpdated { .. } => EVENT_SESSION_UPDATED,
            Self::SessionDeleted { .. } => EVENT_SESSION_DELETED,
            Self::SessionIdle { .. } => EVENT_SESSION_IDLE,
            Self::SessionError { .. } => EVENT_SESSION_ERROR,
            Self::MessageUpdated { .. } => EVENT_MESSAGE_UPDATED,
            Self::MessageRemoved { .. } => EVENT_MESSAGE_REMOVED,
            Self::MessagePartUpdated { .. } => EVENT_MESSAGE_PART_UPDATED,
            Self::MessagePartRemoved { .. } => EVENT_MESSAGE_PART_REMOVED,
            Self::Unknown { event_type, .. } => event_type,
        }
    }

    /// Decodes the JSON payload of a wire event.
    pub fn from_sse(event: &SseEvent) -> Result<Self, EventParseError> {
        parse_event(event.payload())
    }
}

#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("event payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid properties for {event_type}: {source}")]
    Properties {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    properties: Value,
}

#[derive(Debug, Deserialize)]
struct SessionInfoProps {
    info: Session,
}

#[derive(Debug, Deserialize)]
struct SessionIdleProps {
    #[serde(rename = "sessionID")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct SessionErrorProps {
    #[serde(rename = "sessionID", default)]
    session_id: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct MessageInfoProps {
    info: MessageInfo,
}

#[derive(Debug, Deserialize)]
struct MessageRemovedProps {
    #[serde(rename = "sessionID")]
    session_id: String,
    #[serde(rename = "messageID")]
    message_id: String,
}

#[derive(Debug, Deserialize)]
struct PartUpdatedProps {
    part: Part,
}

#[derive(Debug, Deserialize)]
struct PartRemovedProps {
    #[serde(rename = "sessionID")]
    session_id: String,
    #[serde(rename = "messageID")]
    message_id: String,
    #[serde(rename = "partID")]
    part_id: String,
}

/// Parses a `{"type": ..., "properties": {...}}` payload.
pub fn parse_event(payload: &[u8]) -> Result<ServerEvent, EventParseError> {
    let raw: RawEvent = serde_json::from_slice(payload)?;
    let RawEvent {
        event_type,
        properties,
    } = raw;

    let event = match event_type.as_str() {
        EVENT_SERVER_CONNECTED => ServerEvent::ServerConnected,
        EVENT_SESSION_UPDATED => {
            let props: SessionInfoProps = properties_of(&event_type, properties)?;
            ServerEvent::SessionUpdated { info: props.info }
        }
        EVENT_SESSION_DELETED => {
            let props: SessionInfoProps = properties_of(&event_type, properties)?;
            ServerEvent::SessionDeleted { info: props.info }
        }
        EVENT_SESSION_IDLE => {
            let props: SessionIdleProps = properties_of(&event_type, properties)?;
            ServerEvent::SessionIdle {
                session_id: props.session_id,
            }
        }
        EVENT_SESSION_ERROR => {
            let props: SessionErrorProps = properties_of(&event_type, properties)?;
            ServerEvent::SessionError {
                session_id: props.session_id,
                error: props.error,
            }
        }
        EVENT_MESSAGE_UPDATED => {
            let props: MessageInfoProps = properties_of(&event_type, properties)?;
            ServerEvent::MessageUpdated { info: props.info }
        }
        EVENT_MESSAGE_REMOVED => {
            let props: MessageRemovedProps = properties_of(&event_type, properties)?;
            ServerEvent::MessageRemoved {
                session_id: props.session_id,
                message_id: props.message_id,
            }
        }
        EVENT_MESSAGE_PART_UPDATED => {
            let props: PartUpdatedProps = properties_of(&event_type, properties)?;
            ServerEvent::MessagePartUpdated { part: props.part }
        }
        EVENT_MESSAGE_PART_REMOVED => {
            let props: PartRemovedProps = properties_of(&event_type, properties)?;
            ServerEvent::MessagePartRemoved {
                session_id: props.session_id,
                message_id: props.message_id,
                part_id: props.part_id,
            }
        }
        _ => ServerEvent::Unknown {
            event_type,
            payload: properties,
        },
    };

    Ok(event)
}

fn properties_of<T: DeserializeOwned>(
    event_type: &str,
    properties: Value,
) -> Result<T, EventParseError> {
    serde_json::from_value(properties).map_err(|source| EventParseError::Properties {
        event_type: event_type.to_owned(),
        source,
    })
}

/// Best-effort readable message for a session error object.
///
/// Server errors look like `{"name": ..., "data": {"message": ...}}`.
pub fn describe_error(error: &Value) -> String {
    let message = error
        .get("data")
        .and_then(|data| data.get("message"))
        .and_then(Value::as_str)
        .or_else(|| error.get("message").and_then(Value::as_str))
        .filter(|message| !message.trim().is_empty());
    if let Some(message) = message {
        return message.to_owned();
    }

    match error.get("name").and_then(Value::as_str) {
        Some(name) if !name.trim().is_empty() => name.to_owned(),
        _ => match error {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        },
    }
}
