use serde_json::Value;
use tourism_core::{ApiError, ApiResult, Session, SessionKind};
use tracing::debug;

use crate::manager::Sessions;

/// Inspects every result the API client produces.
///
/// Only a 401 is handled here: it expires the session of the kind the
/// request was scoped to and nothing else. Every other outcome is returned
/// to the caller untouched.
#[derive(Debug, Clone)]
pub struct ResponseInterceptor {
    sessions: Sessions,
}

impl ResponseInterceptor {
    pub fn new(sessions: Sessions) -> Self {
        Self { sessions }
    }

    /// `sent_with` is the session snapshot the request was decorated with.
    pub async fn intercept(
        &self,
        scope: SessionKind,
        sent_with: Option<&Session>,
        result: ApiResult<Value>,
    ) -> ApiResult<Value> {
        match &result {
            Err(ApiError::Auth { message }) => {
                debug!(kind = %scope, %message, "Intercepted 401");
                self.sessions
                    .get(scope)
                    .expire(sent_with.map(Session::token))
                    .await;
            }
            Err(e) => debug!(kind = %scope, error = %e, "Passing error through"),
            Ok(_) => {}
        }
        result
    }
}
