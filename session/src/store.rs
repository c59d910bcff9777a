use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tourism_core::{Principal, Session, SessionKind};
use tracing::warn;

use crate::adapters::InMemoryBackend;

/// Error type for storage backend operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend could not be reached or locked
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// One mutation in a storage batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    Set(String, String),
    Remove(String),
}

/// Plain string key/value persistence, the local-storage model.
#[async_trait]
pub trait StorageBackend: Send + Sync + Debug {
    /// Read several keys in one consistent view.
    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError>;

    /// Apply every operation or none of them.
    async fn apply(&self, ops: Vec<StorageOp>) -> Result<(), StoreError>;
}

/// Type alias for Arc-wrapped StorageBackend trait objects
pub type StorageBackendRef = Arc<dyn StorageBackend>;

/// Per-kind session persistence over a [`StorageBackend`].
///
/// Backend failures never reach the caller: a failed read loads as no
/// session, a failed write is a no-op. Both are logged.
#[derive(Debug, Clone)]
pub struct TokenStore {
    backend: StorageBackendRef,
}

impl TokenStore {
    pub fn new(backend: StorageBackendRef) -> Self {
        Self { backend }
    }

    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBackend::new()))
    }

    /// Persist token, principal and expiry of `session` as one write.
    pub async fn save(&self, session: &Session) {
        let kind = session.kind();
        let keys = kind.storage_keys();

        let principal = match serde_json::to_string(session.principal()) {
            Ok(json) => json,
            Err(e) => {
                warn!(%kind, error = %e, "Could not serialize principal, session not persisted");
                return;
            }
        };

        let expiry = match session.expires_at() {
            Some(expires_at) => StorageOp::Set(keys.expires_at.to_string(), expires_at.to_rfc3339()),
            None => StorageOp::Remove(keys.expires_at.to_string()),
        };

        let ops = vec![
            StorageOp::Set(keys.token.to_string(), session.token().to_string()),
            StorageOp::Set(keys.principal.to_string(), principal),
            expiry,
        ];

        if let Err(e) = self.backend.apply(ops).await {
            warn!(%kind, error = %e, "Failed to persist session");
        }
    }

    /// The last saved session of `kind`, if a complete one exists.
    pub async fn load(&self, kind: SessionKind) -> Option<Session> {
        let keys = kind.storage_keys();
        let values = match self
            .backend
            .get_many(&[keys.token, keys.principal, keys.expires_at])
            .await
        {
            Ok(values) => values,
            Err(e) => {
                warn!(%kind, error = %e, "Failed to read session storage");
                return None;
            }
        };

        let mut values = values.into_iter();
        let token = values.next().flatten();
        let principal = values.next().flatten();
        let expires_at = values.next().flatten();

        let (token, principal) = match (token, principal) {
            (Some(token), Some(principal)) => (token, principal),
            (None, None) => return None,
            _ => {
                warn!(%kind, "Ignoring partially stored session");
                return None;
            }
        };

        let principal: Principal = match serde_json::from_str(&principal) {
            Ok(principal) => principal,
            Err(e) => {
                warn!(%kind, error = %e, "Stored principal is unreadable");
                return None;
            }
        };

        let expires_at = match expires_at {
            Some(raw) => match DateTime::parse_from_rfc3339(&raw) {
                Ok(ts) => Some(ts.with_timezone(&Utc)),
                Err(e) => {
                    warn!(%kind, error = %e, "Stored expiry is unreadable");
                    return None;
                }
            },
            None => None,
        };

        Session::new(kind, token, principal, expires_at).ok()
    }

    /// Remove every key of `kind`.
    pub async fn clear(&self, kind: SessionKind) {
        let keys = kind.storage_keys();
        let ops: Vec<StorageOp> = [keys.token, keys.principal, keys.expires_at]
            .into_iter()
            .map(|key| StorageOp::Remove(key.to_string()))
            .collect();

        if let Err(e) = self.backend.apply(ops).await {
            warn!(%kind, error = %e, "Failed to clear session storage");
        }
    }
}
