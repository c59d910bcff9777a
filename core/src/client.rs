use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
pub use reqwest::Method;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::errors::{ApiError, ApiResult};
use crate::reply::Reply;
use crate::stages::{default_stages, DispatchContext, RequestStage};
use crate::types::{Session, SessionKind};

/// A single outbound call. Built per request and dropped once it resolves.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
    /// Overrides the configured timeout for this call only
    pub timeout: Option<Duration>,
    /// Explicit session kind; otherwise derived from the path
    pub scope: Option<SessionKind>,
}

impl OutboundRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
            scope: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replace the default JSON content type, e.g. for multipart uploads.
    pub fn with_content_type(self, content_type: &'static str) -> Self {
        self.with_header(CONTENT_TYPE, HeaderValue::from_static(content_type))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Tag the request with a session kind regardless of its path.
    pub fn scoped(mut self, kind: SessionKind) -> Self {
        self.scope = Some(kind);
        self
    }
}

/// Decorates outbound requests and sends them to the tourism API.
#[derive(Debug)]
pub struct Dispatcher {
    http: Client,
    config: ClientConfig,
    stages: Vec<Box<dyn RequestStage>>,
}

impl Dispatcher {
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            stages: default_stages(),
        })
    }

    /// Append a decoration stage after the defaults.
    pub fn with_stage(mut self, stage: Box<dyn RequestStage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The kind a request targets: its explicit tag, else its path prefix.
    pub fn scope_of(&self, request: &OutboundRequest) -> SessionKind {
        request
            .scope
            .unwrap_or_else(|| self.config.scope_for_path(&request.path))
    }

    /// Run every stage over the request.
    ///
    /// `session` is the snapshot for the request's scope. A session of any
    /// other kind never contributes a header.
    pub fn decorate(
        &self,
        mut request: OutboundRequest,
        session: Option<&Session>,
    ) -> OutboundRequest {
        let ctx = DispatchContext {
            scope: self.scope_of(&request),
            session,
            config: &self.config,
        };
        for stage in &self.stages {
            stage.apply(&mut request, &ctx);
        }
        request
    }

    /// Decorate then send.
    pub async fn dispatch(
        &self,
        request: OutboundRequest,
        session: Option<&Session>,
    ) -> ApiResult<Reply> {
        let request = self.decorate(request, session);
        self.send(request).await
    }

    /// Send an already decorated request. No retries.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send(&self, request: OutboundRequest) -> ApiResult<Reply> {
        let url = self.config.url_for(&request.path);
        let timeout = request.timeout.unwrap_or_else(|| self.config.timeout());

        let mut builder = self
            .http
            .request(request.method, &url)
            .headers(request.headers)
            .timeout(timeout);
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(e, timeout))?;
        debug!(status, bytes = text.len(), "Received response");

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str::<Value>(&text) {
                Ok(value) => value,
                Err(_) => Value::String(text),
            }
        };

        Ok(Reply::decode(status, body))
    }
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout(timeout)
    } else {
        ApiError::Network(format!("Failed to send request: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Principal;
    use reqwest::header::{ACCEPT, AUTHORIZATION};

    fn dispatcher(csrf: Option<&str>) -> Dispatcher {
        let config = ClientConfig {
            csrf_token: csrf.map(str::to_string),
            ..ClientConfig::default()
        };
        Dispatcher::new(config).unwrap()
    }

    fn session(kind: SessionKind, token: &str) -> Session {
        Session::new(kind, token, Principal::new(1, "Someone"), None).unwrap()
    }

    #[test]
    fn test_admin_path_gets_admin_token() {
        let dispatcher = dispatcher(None);
        let admin = session(SessionKind::Admin, "A1");

        let request = dispatcher.decorate(OutboundRequest::get("/admin/attractions"), Some(&admin));

        assert_eq!(request.headers[AUTHORIZATION], "Bearer A1");
        assert_eq!(request.headers[CONTENT_TYPE], "application/json");
        assert_eq!(request.headers[ACCEPT], "application/json");
        assert!(request.headers.contains_key("x-request-id"));
    }

    #[test]
    fn test_session_of_other_kind_is_never_attached() {
        let dispatcher = dispatcher(None);
        let tourist = session(SessionKind::Tourist, "T1");

        let request =
            dispatcher.decorate(OutboundRequest::get("/admin/attractions"), Some(&tourist));
        assert!(!request.headers.contains_key(AUTHORIZATION));

        let request = dispatcher.decorate(OutboundRequest::get("/admin/attractions"), None);
        assert!(!request.headers.contains_key(AUTHORIZATION));
    }

    #[test]
    fn test_explicit_scope_overrides_path() {
        let dispatcher = dispatcher(None);
        let tourist = session(SessionKind::Tourist, "T1");

        let request = OutboundRequest::get("/admin/public-stats").scoped(SessionKind::Tourist);
        assert_eq!(dispatcher.scope_of(&request), SessionKind::Tourist);

        let request = dispatcher.decorate(request, Some(&tourist));
        assert_eq!(request.headers[AUTHORIZATION], "Bearer T1");
    }

    #[test]
    fn test_csrf_header_independent_of_session() {
        let dispatcher = dispatcher(Some("csrf-abc"));

        let request = dispatcher.decorate(OutboundRequest::post("/tourist/register"), None);

        assert_eq!(request.headers["x-csrf-token"], "csrf-abc");
        assert!(!request.headers.contains_key(AUTHORIZATION));
    }

    #[test]
    fn test_content_type_override_survives() {
        let dispatcher = dispatcher(None);

        let request = dispatcher.decorate(
            OutboundRequest::post("/admin/attractions").with_content_type("multipart/form-data"),
            None,
        );

        assert_eq!(request.headers[CONTENT_TYPE], "multipart/form-data");
        assert_eq!(request.headers[ACCEPT], "application/json");
    }

    #[derive(Debug)]
    struct Locale;

    impl RequestStage for Locale {
        fn apply(&self, request: &mut OutboundRequest, ctx: &DispatchContext<'_>) {
            let locale = match ctx.scope {
                SessionKind::Admin => "en",
                SessionKind::Tourist => "id",
            };
            request
                .headers
                .insert("accept-language", HeaderValue::from_static(locale));
        }
    }

    #[test]
    fn test_extra_stage_runs_after_defaults() {
        let dispatcher = dispatcher(None).with_stage(Box::new(Locale));
        let admin = session(SessionKind::Admin, "A1");

        let request = dispatcher.decorate(OutboundRequest::get("admin/attractions"), Some(&admin));
        assert_eq!(request.headers["accept-language"], "en");
        assert_eq!(request.headers[AUTHORIZATION], "Bearer A1");

        let request = dispatcher.decorate(OutboundRequest::get("/attractions"), None);
        assert_eq!(request.headers["accept-language"], "id");
    }
}
