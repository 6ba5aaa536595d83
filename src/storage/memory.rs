use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{StorageError, StorageGateway, StorageKey};

/// An in-memory store. Contents are lost when the store is dropped, which
/// makes it suitable for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<StorageKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageGateway for MemoryStore {
    async fn get(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().await;

        Ok(values.get(&key).cloned())
    }

    async fn put(&self, key: StorageKey, payload: String) -> Result<(), StorageError> {
        let mut values = self.values.lock().await;
        values.insert(key, payload);

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn get_missing_key() {
        let store = MemoryStore::new();

        let value = store.get(StorageKey::Groups).await.expect("get failed");

        assert_eq!(None, value);
    }

    #[tokio::test]
    async fn put_then_get() {
        let store = MemoryStore::new();

        store
            .put(StorageKey::Friends, "[]".to_owned())
            .await
            .expect("put failed");
        let value = store.get(StorageKey::Friends).await.expect("get failed");

        assert_eq!(Some("[]".to_owned()), value);
    }

    #[tokio::test]
    async fn put_replaces_previous_value() {
        let store = MemoryStore::new();

        store
            .put(StorageKey::User, "first".to_owned())
            .await
            .expect("put failed");
        store
            .put(StorageKey::User, "second".to_owned())
            .await
            .expect("put failed");
        let value = store.get(StorageKey::User).await.expect("get failed");

        assert_eq!(Some("second".to_owned()), value);
    }
}
