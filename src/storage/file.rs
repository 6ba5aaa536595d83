use std::{collections::BTreeMap, io::ErrorKind, path::PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::trace;

use super::{StorageError, StorageGateway, StorageKey};

/// A store backed by a single JSON file mapping keys to payload strings.
///
/// The whole map is rewritten on every `put`. A missing file reads as an
/// empty store.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes writers so two puts cannot interleave their read-modify-
    // write cycles.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => {
                return Err(StorageError::Backend(anyhow::Error::new(err).context(
                    format!("failed to read store file {}", self.path.display()),
                )))
            }
        };

        serde_json::from_str(&raw).map_err(|err| {
            StorageError::Backend(anyhow::Error::new(err).context(format!(
                "store file {} is not a valid key/value map",
                self.path.display()
            )))
        })
    }
}

#[async_trait]
impl StorageGateway for JsonFileStore {
    async fn get(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
        let map = self.read_map().await?;

        Ok(map.get(key.as_str()).cloned())
    }

    async fn put(&self, key: StorageKey, payload: String) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut map = self.read_map().await?;
        map.insert(key.as_str().to_owned(), payload);

        let serialized = serde_json::to_string(&map)
            .map_err(|err| StorageError::Backend(anyhow::Error::new(err)))?;

        tokio::fs::write(&self.path, serialized)
            .await
            .map_err(|err| {
                StorageError::Backend(anyhow::Error::new(err).context(format!(
                    "failed to write store file {}",
                    self.path.display()
                )))
            })?;

        trace!(%key, path = %self.path.display(), "Persisted storage key.");

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use uuid::Uuid;

    use super::*;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir().join(format!("splitledger-store-{}.json", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let store = JsonFileStore::new(scratch_path());

        let value = store.get(StorageKey::Groups).await.expect("get failed");

        assert_eq!(None, value);
    }

    #[tokio::test]
    async fn put_then_get_across_instances() {
        let path = scratch_path();

        {
            let store = JsonFileStore::new(&path);
            store
                .put(StorageKey::PendingBills, "[1,2,3]".to_owned())
                .await
                .expect("put failed");
        }

        let reopened = JsonFileStore::new(&path);
        let value = reopened
            .get(StorageKey::PendingBills)
            .await
            .expect("get failed");

        assert_eq!(Some("[1,2,3]".to_owned()), value);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn puts_to_distinct_keys_are_kept() {
        let path = scratch_path();
        let store = JsonFileStore::new(&path);

        store
            .put(StorageKey::User, "{}".to_owned())
            .await
            .expect("put failed");
        store
            .put(StorageKey::Activities, "[]".to_owned())
            .await
            .expect("put failed");

        assert_eq!(
            Some("{}".to_owned()),
            store.get(StorageKey::User).await.expect("get failed")
        );
        assert_eq!(
            Some("[]".to_owned()),
            store.get(StorageKey::Activities).await.expect("get failed")
        );

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn corrupt_file_reports_backend_error() {
        let path = scratch_path();
        tokio::fs::write(&path, "not json")
            .await
            .expect("write failed");

        let store = JsonFileStore::new(&path);
        let err = store
            .get(StorageKey::User)
            .await
            .expect_err("corrupt file should not read");

        assert!(matches!(err, StorageError::Backend(_)));

        let _ = tokio::fs::remove_file(&path).await;
    }
}
