//! Request decoration stages.
//!
//! Every outbound request passes through an ordered list of stages before it
//! is sent. Each stage only mutates the request value it is handed.

use std::fmt::Debug;

use reqwest::header::{HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use tracing::warn;
use uuid::Uuid;

use crate::client::OutboundRequest;
use crate::config::ClientConfig;
use crate::types::{Session, SessionKind};

/// What a stage may consult while decorating a request.
#[derive(Debug, Clone, Copy)]
pub struct DispatchContext<'a> {
    /// Kind the request is scoped to
    pub scope: SessionKind,
    /// Session snapshot taken at dispatch time
    pub session: Option<&'a Session>,
    pub config: &'a ClientConfig,
}

pub trait RequestStage: Send + Sync + Debug {
    fn apply(&self, request: &mut OutboundRequest, ctx: &DispatchContext<'_>);
}

/// JSON content negotiation unless the caller already chose otherwise.
#[derive(Debug, Default)]
pub struct DefaultHeaders;

impl RequestStage for DefaultHeaders {
    fn apply(&self, request: &mut OutboundRequest, _ctx: &DispatchContext<'_>) {
        let json = HeaderValue::from_static("application/json");
        if !request.headers.contains_key(CONTENT_TYPE) {
            request.headers.insert(CONTENT_TYPE, json.clone());
        }
        if !request.headers.contains_key(ACCEPT) {
            request.headers.insert(ACCEPT, json);
        }
        request.headers.insert(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        );
    }
}

/// `Authorization: Bearer` from the session of the request's own scope.
#[derive(Debug, Default)]
pub struct BearerAuth;

impl RequestStage for BearerAuth {
    fn apply(&self, request: &mut OutboundRequest, ctx: &DispatchContext<'_>) {
        let Some(session) = ctx.session.filter(|s| s.kind() == ctx.scope) else {
            return;
        };

        match HeaderValue::from_str(&format!("Bearer {}", session.token())) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers.insert(AUTHORIZATION, value);
            }
            Err(e) => warn!(kind = %ctx.scope, error = %e, "Stored token is not a valid header value"),
        }
    }
}

/// CSRF header when the host environment provided a token.
#[derive(Debug, Default)]
pub struct CsrfToken;

impl RequestStage for CsrfToken {
    fn apply(&self, request: &mut OutboundRequest, ctx: &DispatchContext<'_>) {
        let Some(token) = ctx.config.csrf_token.as_deref().filter(|t| !t.is_empty()) else {
            return;
        };

        let name = match HeaderName::from_bytes(ctx.config.csrf_header.as_bytes()) {
            Ok(name) => name,
            Err(e) => {
                warn!(header = %ctx.config.csrf_header, error = %e, "Invalid CSRF header name");
                return;
            }
        };
        match HeaderValue::from_str(token) {
            Ok(value) => {
                request.headers.insert(name, value);
            }
            Err(e) => warn!(error = %e, "Invalid CSRF token value"),
        }
    }
}

/// Correlation id for server-side logs.
#[derive(Debug, Default)]
pub struct RequestId;

impl RequestStage for RequestId {
    fn apply(&self, request: &mut OutboundRequest, _ctx: &DispatchContext<'_>) {
        let name = HeaderName::from_static("x-request-id");
        if request.headers.contains_key(&name) {
            return;
        }
        if let Ok(value) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
            request.headers.insert(name, value);
        }
    }
}

/// The stage order every dispatcher starts with.
pub fn default_stages() -> Vec<Box<dyn RequestStage>> {
    vec![
        Box::new(DefaultHeaders),
        Box::new(BearerAuth),
        Box::new(CsrfToken),
        Box::new(RequestId),
    ]
}
