use std::collections::BTreeMap;

use crate::config::ApiConfig;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_USER_AGENT: &str = "user-agent";
pub const HEADER_DIRECTORY: &str = "x-opencode-directory";

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_EVENT_STREAM: &str = "text/event-stream";

/// Which kind of response the request expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    Json,
    EventStream,
}

/// Build a deterministic header map for a server request.
pub fn build_headers(config: &ApiConfig, accept: Accept) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();

    let accept = match accept {
        Accept::Json => CONTENT_TYPE_JSON,
        Accept::EventStream => CONTENT_TYPE_EVENT_STREAM,
    };
    headers.insert(HEADER_ACCEPT.to_owned(), accept.to_owned());
    headers.insert(HEADER_CONTENT_TYPE.to_owned(), CONTENT_TYPE_JSON.to_owned());

    let user_agent = config
        .user_agent
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(default_user_agent);
    headers.insert(HEADER_USER_AGENT.to_owned(), user_agent);

    if let Some(directory) = config
        .directory
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        headers.insert(HEADER_DIRECTORY.to_owned(), directory.to_owned());
    }

    for (key, value) in &config.extra_headers {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    headers
}

fn default_user_agent() -> String {
    format!(
        "opencode-tui/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_headers_are_lowercased_and_override_defaults() {
        let config = ApiConfig::default().insert_header("Accept", " text/plain ");
        let headers = build_headers(&config, Accept::Json);
        assert_eq!(headers.get(HEADER_ACCEPT).map(String::as_str), Some("text/plain"));
    }

    #[test]
    fn blank_user_agent_falls_back_to_default() {
        let config = ApiConfig::default().with_user_agent("   ");
        let headers = build_headers(&config, Accept::EventStream);
        let user_agent = headers.get(HEADER_USER_AGENT).cloned().unwrap_or_default();
        assert!(user_agent.starts_with("opencode-tui/"));
        assert_eq!(
            headers.get(HEADER_ACCEPT).map(String::as_str),
            Some(CONTENT_TYPE_EVENT_STREAM)
        );
    }
}
