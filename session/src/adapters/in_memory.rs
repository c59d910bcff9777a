use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use log::debug;

use crate::store::{StorageBackend, StorageOp, StoreError};

/// In-memory implementation of StorageBackend
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    /// Thread-safe key/value storage
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryBackend {
    /// Create a new InMemoryBackend
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError> {
        let entries = self.entries.read().map_err(|e| {
            StoreError::Unavailable(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(keys.iter().map(|key| entries.get(*key).cloned()).collect())
    }

    async fn apply(&self, ops: Vec<StorageOp>) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|e| {
            StoreError::Unavailable(format!("Failed to acquire write lock: {}", e))
        })?;

        for op in ops {
            match op {
                StorageOp::Set(key, value) => {
                    debug!("Set storage key: {}", key);
                    entries.insert(key, value);
                }
                StorageOp::Remove(key) => {
                    if entries.remove(&key).is_some() {
                        debug!("Removed storage key: {}", key);
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::test;

    #[test]
    async fn test_set_and_get() {
        let backend = InMemoryBackend::new();

        backend
            .apply(vec![
                StorageOp::Set("key1".to_string(), "value1".to_string()),
                StorageOp::Set("key2".to_string(), "value2".to_string()),
            ])
            .await
            .unwrap();

        let values = backend.get_many(&["key1", "key2", "key3"]).await.unwrap();
        assert_eq!(
            values,
            vec![Some("value1".to_string()), Some("value2".to_string()), None]
        );
        assert_eq!(backend.len(), 2);
    }

    #[test]
    async fn test_remove() {
        let backend = InMemoryBackend::new();
        backend
            .apply(vec![StorageOp::Set("key".to_string(), "value".to_string())])
            .await
            .unwrap();

        backend
            .apply(vec![
                StorageOp::Remove("key".to_string()),
                StorageOp::Remove("missing".to_string()),
            ])
            .await
            .unwrap();

        assert!(backend.is_empty());
    }
}
