use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fd_lock::RwLock;
use log::{debug, warn};
use tokio::sync::Mutex;

use crate::store::{StorageBackend, StorageOp, StoreError};

type Entries = BTreeMap<String, String>;

/// JSON file backed storage.
///
/// The whole key space lives in one file which is replaced atomically on
/// every write. Writers are serialized within the process by a mutex and
/// across processes by an advisory lock on a `.lock` file next to it, so a
/// second `tourism-cli` never resurrects keys this one just removed.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_entries(content: &str) -> Result<Entries, StoreError> {
    if content.trim().is_empty() {
        return Ok(Entries::new());
    }
    Ok(serde_json::from_str(content)?)
}

fn read_entries(path: &Path) -> Result<Entries, StoreError> {
    match fs::read_to_string(path) {
        Ok(content) => parse_entries(&content),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Entries::new()),
        Err(e) => Err(e.into()),
    }
}

fn write_entries(path: &Path, entries: &Entries) -> Result<(), StoreError> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, serde_json::to_vec_pretty(entries)?)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        warn!("Failed to move {} into place: {}", tmp_path.display(), e);
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Read-modify-write under the cross-process lock. Returns the key count.
fn apply_locked(path: &Path, ops: Vec<StorageOp>) -> Result<usize, StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path.with_extension("lock"))?;
    let mut lock = RwLock::new(lock_file);
    let _held = lock.write()?;

    let mut entries = read_entries(path)?;
    for op in ops {
        match op {
            StorageOp::Set(key, value) => {
                entries.insert(key, value);
            }
            StorageOp::Remove(key) => {
                entries.remove(&key);
            }
        }
    }

    write_entries(path, &entries)?;
    Ok(entries.len())
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError> {
        let entries = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => parse_entries(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Entries::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(keys.iter().map(|key| entries.get(*key).cloned()).collect())
    }

    async fn apply(&self, ops: Vec<StorageOp>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let path = self.path.clone();
        let written = tokio::task::spawn_blocking(move || apply_locked(&path, ops))
            .await
            .map_err(|e| StoreError::Unavailable(format!("Storage task failed: {}", e)))??;

        debug!("Wrote {} storage keys to {}", written, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_values_survive_a_new_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("sessions.json");

        let backend = FileBackend::new(&path);
        backend
            .apply(vec![StorageOp::Set("admin_session".into(), "A1".into())])
            .await
            .unwrap();

        let reopened = FileBackend::new(&path);
        assert_eq!(
            reopened.get_many(&["admin_session"]).await.unwrap(),
            vec![Some("A1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("absent.json"));

        assert_eq!(backend.get_many(&["a", "b"]).await.unwrap(), vec![None, None]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        std::fs::write(&path, "{{{").unwrap();

        let backend = FileBackend::new(&path);
        assert!(backend.get_many(&["a"]).await.is_err());
        assert!(backend
            .apply(vec![StorageOp::Set("a".into(), "1".into())])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_writers_on_separate_handles_keep_every_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        // Independent backends share no in-process mutex, like two processes.
        let mut handles = Vec::new();
        for i in 0..8 {
            let backend = FileBackend::new(&path);
            handles.push(tokio::spawn(async move {
                backend
                    .apply(vec![StorageOp::Set(format!("key{}", i), i.to_string())])
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let keys: Vec<String> = (0..8).map(|i| format!("key{}", i)).collect();
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let values = FileBackend::new(&path).get_many(&key_refs).await.unwrap();
        assert!(values.iter().all(Option::is_some));
    }

    #[tokio::test]
    async fn test_removed_keys_stay_removed_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        let first = FileBackend::new(&path);
        let second = FileBackend::new(&path);

        first
            .apply(vec![
                StorageOp::Set("admin_session".into(), "A1".into()),
                StorageOp::Set("tourist_session".into(), "T1".into()),
            ])
            .await
            .unwrap();
        second
            .apply(vec![StorageOp::Remove("tourist_session".into())])
            .await
            .unwrap();
        first
            .apply(vec![StorageOp::Set("admin_session".into(), "A2".into())])
            .await
            .unwrap();

        assert_eq!(
            second.get_many(&["admin_session", "tourist_session"]).await.unwrap(),
            vec![Some("A2".to_string()), None]
        );
    }

    #[tokio::test]
    async fn test_concurrent_writes_keep_every_key() {
        let dir = tempfile::tempdir().unwrap();
        let backend = std::sync::Arc::new(FileBackend::new(dir.path().join("sessions.json")));

        let mut handles = Vec::new();
        for i in 0..8 {
            let backend = backend.clone();
            handles.push(tokio::spawn(async move {
                backend
                    .apply(vec![StorageOp::Set(format!("key{}", i), i.to_string())])
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let keys: Vec<String> = (0..8).map(|i| format!("key{}", i)).collect();
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let values = backend.get_many(&key_refs).await.unwrap();
        assert!(values.iter().all(Option::is_some));
    }
}
