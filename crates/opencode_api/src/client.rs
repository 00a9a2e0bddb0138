use std::future::Future;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{parse_error_message, ApiError};
use crate::headers::{build_headers, Accept};
use crate::payload::{ChatRequest, CreateSessionRequest, InitRequest, SummarizeRequest};
use crate::types::{Agent, Config, MessageWithParts, ProvidersResponse, Session};
use crate::url::{endpoint, normalize_base_url};

/// Typed client for the server's REST endpoints and event stream.
#[derive(Debug, Clone)]
pub struct OpencodeClient {
    http: Client,
    config: ApiConfig,
    base_url: String,
}

impl OpencodeClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(&config.base_url)?;
        // The timeout is applied per request so the event stream can stay open.
        let http = Client::builder().build().map_err(ApiError::from)?;
        Ok(Self {
            http,
            config,
            base_url,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_headers(&self, accept: Accept) -> Result<HeaderMap, ApiError> {
        let headers = build_headers(&self.config, accept);
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| ApiError::InvalidHeader(format!("invalid header key: {key}")))?,
                HeaderValue::from_str(&value)
                    .map_err(|_| ApiError::InvalidHeader(format!("invalid header value for {key}")))?,
            );
        }
        Ok(out)
    }

    /// Builds a request for `path` relative to the base URL.
    pub fn build_request(
        &self,
        method: Method,
        path: &str,
        accept: Accept,
    ) -> Result<RequestBuilder, ApiError> {
        let headers = self.build_headers(accept)?;
        let mut builder = self
            .http
            .request(method, endpoint(&self.base_url, path))
            .headers(headers);
        if accept == Accept::Json {
            if let Some(timeout) = self.config.timeout {
                builder = builder.timeout(timeout);
            }
        }
        Ok(builder)
    }

    pub async fn get_config(&self) -> Result<Config, ApiError> {
        let request = self.build_request(Method::GET, "/config", Accept::Json)?;
        self.execute_json(request).await
    }

    pub fn build_update_config_request(&self, config: &Config) -> Result<RequestBuilder, ApiError> {
        Ok(self
            .build_request(Method::PATCH, "/config", Accept::Json)?
            .json(config))
    }

    pub async fn update_config(&self, config: &Config) -> Result<Config, ApiError> {
        let request = self.build_update_config_request(config)?;
        self.execute_json(request).await
    }

    pub async fn list_providers(&self) -> Result<ProvidersResponse, ApiError> {
        let request = self.build_request(Method::GET, "/config/providers", Accept::Json)?;
        self.execute_json(request).await
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>, ApiError> {
        let request = self.build_request(Method::GET, "/agent", Accept::Json)?;
        self.execute_json(request).await
    }

    pub async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
        let request = self.build_request(Method::GET, "/session", Accept::Json)?;
        self.execute_json(request).await
    }

    pub async fn create_session(&self, body: &CreateSessionRequest) -> Result<Session, ApiError> {
        let request = self
            .build_request(Method::POST, "/session", Accept::Json)?
            .json(body);
        self.execute_json(request).await
    }

    pub fn build_delete_session_request(&self, session_id: &str) -> Result<RequestBuilder, ApiError> {
        self.build_request(Method::DELETE, &session_path(session_id, ""), Accept::Json)
    }

    /// Deletes the session. The server confirms with `session.deleted`.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        let request = self.build_delete_session_request(session_id)?;
        self.execute(request).await.map(drop)
    }

    pub async fn list_messages(&self, session_id: &str) -> Result<Vec<MessageWithParts>, ApiError> {
        let request =
            self.build_request(Method::GET, &session_path(session_id, "/message"), Accept::Json)?;
        self.execute_json(request).await
    }

    pub fn build_chat_request(
        &self,
        session_id: &str,
        body: &ChatRequest,
    ) -> Result<RequestBuilder, ApiError> {
        Ok(self
            .build_request(Method::POST, &session_path(session_id, "/message"), Accept::Json)?
            .json(body))
    }

    /// Sends a chat message. The reply arrives through the event stream.
    pub async fn send_chat(&self, session_id: &str, body: &ChatRequest) -> Result<(), ApiError> {
        let request = self.build_chat_request(session_id, body)?;
        self.execute(request).await.map(drop)
    }

    pub async fn abort_session(&self, session_id: &str) -> Result<(), ApiError> {
        let request =
            self.build_request(Method::POST, &session_path(session_id, "/abort"), Accept::Json)?;
        self.execute(request).await.map(drop)
    }

    pub fn build_init_request(
        &self,
        session_id: &str,
        body: &InitRequest,
    ) -> Result<RequestBuilder, ApiError> {
        Ok(self
            .build_request(Method::POST, &session_path(session_id, "/init"), Accept::Json)?
            .json(body))
    }

    /// Starts project initialization in the session. Progress arrives
    /// through the event stream.
    pub async fn init_session(&self, session_id: &str, body: &InitRequest) -> Result<(), ApiError> {
        let request = self.build_init_request(session_id, body)?;
        self.execute(request).await.map(drop)
    }

    pub fn build_summarize_request(
        &self,
        session_id: &str,
        body: &SummarizeRequest,
    ) -> Result<RequestBuilder, ApiError> {
        Ok(self
            .build_request(Method::POST, &session_path(session_id, "/summarize"), Accept::Json)?
            .json(body))
    }

    /// Summarizes the session. Resolves to [`ApiError::Cancelled`] as soon as
    /// `cancel` fires.
    pub async fn summarize_session(
        &self,
        session_id: &str,
        body: &SummarizeRequest,
        cancel: &CancellationToken,
    ) -> Result<(), ApiError> {
        let request = self.build_summarize_request(session_id, body)?;
        with_cancellation(self.execute(request), cancel)
            .await?
            .map(drop)
    }

    /// Opens `GET /event`. The returned response body is the raw SSE stream.
    pub async fn subscribe_events(&self, cancel: &CancellationToken) -> Result<Response, ApiError> {
        let request = self.build_request(Method::GET, "/event", Accept::EventStream)?;
        debug!(base_url = %self.base_url, "opening event stream");
        with_cancellation(self.execute(request), cancel).await?
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(ApiError::from)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
        Err(ApiError::Status(status, parse_error_message(status, &body)))
    }

    async fn execute_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.execute(request).await?;
        let bytes = response.bytes().await.map_err(ApiError::from)?;
        serde_json::from_slice(&bytes).map_err(ApiError::from)
    }
}

/// Runs `future` unless `cancel` fires first.
pub async fn with_cancellation<F>(future: F, cancel: &CancellationToken) -> Result<F::Output, ApiError>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ApiError::Cancelled),
        output = future => Ok(output),
    }
}

fn session_path(session_id: &str, suffix: &str) -> String {
    format!("/session/{session_id}{suffix}")
}
