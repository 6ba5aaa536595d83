use std::{fmt, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

pub type DynStorageGateway = Arc<dyn StorageGateway + Send + Sync>;

/// A key naming one persisted collection.
///
/// The string forms are a compatibility contract with previously written
/// stores and must not change.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StorageKey {
    User,
    Groups,
    Friends,
    Messages,
    Activities,
    PendingBills,
}

impl StorageKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Groups => "groups",
            Self::Friends => "friends",
            Self::Messages => "messages",
            Self::Activities => "activities",
            Self::PendingBills => "pendingBills",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Durable string key/value storage for collection snapshots.
///
/// Values are opaque payloads. Each `put` replaces the previous value for
/// the key in full, so a store that missed an earlier write converges on
/// the next successful one.
#[async_trait]
pub trait StorageGateway {
    /// Fetch the stored payload for a key, if one exists.
    async fn get(&self, key: StorageKey) -> Result<Option<String>, StorageError>;

    /// Store a payload, replacing any previous value for the key.
    async fn put(&self, key: StorageKey, payload: String) -> Result<(), StorageError>;
}

#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store failed to read or write.
    #[error("storage backend failure")]
    Backend(#[source] anyhow::Error),

    /// A stored payload could not be serialized or deserialized.
    #[error("malformed payload for key {key}")]
    Payload {
        key: StorageKey,
        #[source]
        source: serde_json::Error,
    },
}
