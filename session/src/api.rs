use std::sync::Arc;

use serde_json::Value;
use tourism_core::{ApiResult, ClientConfig, Dispatcher, OutboundRequest, SessionKind};
use tracing::instrument;

use crate::interceptor::ResponseInterceptor;
use crate::manager::{SessionManager, Sessions};
use crate::navigator::NavigatorRef;
use crate::store::TokenStore;

/// The assembled pipeline: dispatcher, one session manager per kind and the
/// response interceptor.
///
/// ```rust,ignore
/// let client = ApiClient::new(config, TokenStore::in_memory(), Arc::new(TracingNavigator))?;
/// client.rehydrate_all().await;
/// let attractions = client.send(OutboundRequest::get("/admin/attractions")).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    dispatcher: Arc<Dispatcher>,
    sessions: Sessions,
    interceptor: ResponseInterceptor,
}

impl ApiClient {
    pub fn new(config: ClientConfig, store: TokenStore, navigator: NavigatorRef) -> ApiResult<Self> {
        Ok(Self::from_dispatcher(Dispatcher::new(config)?, store, navigator))
    }

    pub fn from_dispatcher(dispatcher: Dispatcher, store: TokenStore, navigator: NavigatorRef) -> Self {
        let dispatcher = Arc::new(dispatcher);
        let sessions = Sessions::new(store, dispatcher.clone(), navigator);
        let interceptor = ResponseInterceptor::new(sessions.clone());
        Self {
            dispatcher,
            sessions,
            interceptor,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn session(&self, kind: SessionKind) -> &Arc<SessionManager> {
        self.sessions.get(kind)
    }

    pub fn admin(&self) -> &Arc<SessionManager> {
        self.sessions.admin()
    }

    pub fn tourist(&self) -> &Arc<SessionManager> {
        self.sessions.tourist()
    }

    /// Load both kinds from storage, as on app start.
    pub async fn rehydrate_all(&self) {
        for kind in SessionKind::ALL {
            self.sessions.get(kind).rehydrate().await;
        }
    }

    /// Send a request through the full pipeline.
    ///
    /// The request carries the session of its scope as it was at this
    /// moment; clearing that session later does not affect it.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send(&self, request: OutboundRequest) -> ApiResult<Value> {
        let scope = self.dispatcher.scope_of(&request);
        let snapshot = self.sessions.get(scope).current();

        let result = self
            .dispatcher
            .dispatch(request, snapshot.as_ref())
            .await
            .and_then(|reply| reply.into_result());

        self.interceptor
            .intercept(scope, snapshot.as_ref(), result)
            .await
    }

    pub async fn get(&self, path: &str) -> ApiResult<Value> {
        self.send(OutboundRequest::get(path)).await
    }

    pub async fn post(&self, path: &str, body: Value) -> ApiResult<Value> {
        self.send(OutboundRequest::post(path).with_body(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> ApiResult<Value> {
        self.send(OutboundRequest::put(path).with_body(body)).await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<Value> {
        self.send(OutboundRequest::delete(path)).await
    }
}
