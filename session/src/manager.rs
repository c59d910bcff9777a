use std::sync::{Arc, RwLock};

use tourism_core::{
    jwt_expiry, payload, ApiError, ApiResult, Credentials, Dispatcher, LoginResponse,
    OutboundRequest, Principal, Session, SessionKind,
};
use tracing::{debug, info, instrument, warn};

use crate::navigator::NavigatorRef;
use crate::store::TokenStore;

/// Authentication state and operations for one session kind.
///
/// Each manager only ever reads and writes its own kind's storage keys and
/// in-memory session.
#[derive(Debug)]
pub struct SessionManager {
    kind: SessionKind,
    current: RwLock<Option<Session>>,
    store: TokenStore,
    dispatcher: Arc<Dispatcher>,
    navigator: NavigatorRef,
}

impl SessionManager {
    pub fn new(
        kind: SessionKind,
        store: TokenStore,
        dispatcher: Arc<Dispatcher>,
        navigator: NavigatorRef,
    ) -> Self {
        Self {
            kind,
            current: RwLock::new(None),
            store,
            dispatcher,
            navigator,
        }
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    /// Snapshot of the in-memory session.
    pub fn current(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Pure predicate over the in-memory session; never touches storage.
    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    fn set_current(&self, session: Option<Session>) {
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = session;
    }

    /// Drop the in-memory session only if it still carries `token`.
    ///
    /// Returns false when a newer session replaced it in the meantime.
    fn take_if_token(&self, token: Option<&str>) -> bool {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if current.as_ref().map(Session::token) != token {
            return false;
        }
        *current = None;
        true
    }

    /// Load the persisted session into memory. Returns whether one was found.
    pub async fn rehydrate(&self) -> bool {
        match self.store.load(self.kind).await {
            Some(session) => {
                debug!(kind = %self.kind, "Rehydrated session from storage");
                self.set_current(Some(session));
                true
            }
            None => false,
        }
    }

    /// Authenticate against the kind's login endpoint.
    ///
    /// On failure the stored and in-memory session are left as they were
    /// and the server's message is returned in the error.
    #[instrument(skip(self, credentials), fields(kind = %self.kind))]
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<Session> {
        let endpoints = self.dispatcher.config().endpoints.for_kind(self.kind);
        let request = OutboundRequest::post(endpoints.login)
            .with_body(credentials.to_body(self.kind))
            .scoped(self.kind);

        let body = self.dispatcher.dispatch(request, None).await?.into_result()?;
        let response: LoginResponse = serde_json::from_value(body)?;

        let token = response
            .token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| ApiError::Parsing("Login response carried no token".to_string()))?;
        let principal = response
            .principal
            .ok_or_else(|| ApiError::Parsing("Login response carried no principal".to_string()))?;
        let expires_at = response.expires_at.or_else(|| jwt_expiry(&token));

        let session = Session::new(self.kind, token, principal, expires_at)?;
        self.store.save(&session).await;
        self.set_current(Some(session.clone()));

        info!(principal_id = session.principal().id, "Logged in");
        Ok(session)
    }

    /// Clear the session locally after telling the server, whatever the
    /// server answers.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn logout(&self) {
        let session = match self.current() {
            Some(session) => Some(session),
            None => self.store.load(self.kind).await,
        };

        if let Some(session) = &session {
            let endpoints = self.dispatcher.config().endpoints.for_kind(self.kind);
            let request = OutboundRequest::post(endpoints.logout).scoped(self.kind);
            let outcome = self
                .dispatcher
                .dispatch(request, Some(session))
                .await
                .and_then(|reply| reply.into_result());
            match outcome {
                Ok(_) => debug!("Server acknowledged logout"),
                Err(e) => warn!(error = %e, "Server logout failed, clearing local session anyway"),
            }
        }

        self.set_current(None);
        self.store.clear(self.kind).await;
        info!("Logged out");
    }

    /// Verify the session with the server.
    ///
    /// Rehydrates from storage first when nothing is in memory. An expired
    /// session or a non-success response clears the session. A transport
    /// failure returns false but keeps the session for a later retry.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn check_auth(&self) -> bool {
        if self.current().is_none() && !self.rehydrate().await {
            return false;
        }
        let Some(session) = self.current() else {
            return false;
        };

        if session.is_expired() {
            info!("Session expired locally");
            self.discard(Some(session.token())).await;
            return false;
        }

        let endpoints = self.dispatcher.config().endpoints.for_kind(self.kind);
        let request = OutboundRequest::get(endpoints.profile).scoped(self.kind);
        let reply = match self.dispatcher.dispatch(request, Some(&session)).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Could not reach the server to verify session");
                return false;
            }
        };

        match reply.into_result() {
            Ok(body) => {
                if let Ok(principal) = serde_json::from_value::<Principal>(payload(body)) {
                    self.refresh_principal(&session, principal).await;
                }
                true
            }
            Err(e) => {
                info!(error = %e, "Server rejected session");
                self.discard(Some(session.token())).await;
                false
            }
        }
    }

    /// Forced logout after the server answered 401 to a request sent with
    /// `stale_token`. Clears storage and memory, then navigates to this
    /// kind's login surface.
    ///
    /// Skipped when a newer session replaced the one the request carried.
    pub async fn expire(&self, stale_token: Option<&str>) {
        if !self.discard(stale_token).await {
            debug!(kind = %self.kind, "Ignoring 401 for a session that was already replaced");
            return;
        }
        warn!(kind = %self.kind, "Session rejected by server, redirecting to login");
        self.navigator.navigate(self.kind, self.kind.login_surface());
    }

    async fn discard(&self, token: Option<&str>) -> bool {
        if !self.take_if_token(token) {
            return false;
        }
        self.store.clear(self.kind).await;
        true
    }

    async fn refresh_principal(&self, session: &Session, principal: Principal) {
        if session.principal() == &principal {
            return;
        }
        let refreshed = session.clone().with_principal(principal);
        {
            let mut current = self
                .current
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if current.as_ref().map(Session::token) != Some(session.token()) {
                return;
            }
            *current = Some(refreshed.clone());
        }
        self.store.save(&refreshed).await;
    }
}

/// The admin and tourist managers, one of each.
#[derive(Debug, Clone)]
pub struct Sessions {
    admin: Arc<SessionManager>,
    tourist: Arc<SessionManager>,
}

impl Sessions {
    pub fn new(store: TokenStore, dispatcher: Arc<Dispatcher>, navigator: NavigatorRef) -> Self {
        Self {
            admin: Arc::new(SessionManager::new(
                SessionKind::Admin,
                store.clone(),
                dispatcher.clone(),
                navigator.clone(),
            )),
            tourist: Arc::new(SessionManager::new(
                SessionKind::Tourist,
                store,
                dispatcher,
                navigator,
            )),
        }
    }

    pub fn get(&self, kind: SessionKind) -> &Arc<SessionManager> {
        match kind {
            SessionKind::Admin => &self.admin,
            SessionKind::Tourist => &self.tourist,
        }
    }

    pub fn admin(&self) -> &Arc<SessionManager> {
        &self.admin
    }

    pub fn tourist(&self) -> &Arc<SessionManager> {
        &self.tourist
    }
}
