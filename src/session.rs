//! The single owner of all ledger state.
//!
//! Every mutating operation is a `&mut self` method on [`Session`], so
//! the serial event-handling model is enforced by the borrow checker.
//! Mutations follow one discipline: clone the affected collections,
//! change the clones, persist every affected key, and only then commit
//! the clones into the session. A failed write leaves memory exactly as
//! it was before the call.

use std::{collections::BTreeMap, fmt};

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::{
    error::CoreError,
    groups::{Group, GroupId},
    identities::{Friend, User},
    ledger::domain::{
        activity::Activity,
        bills::{Bill, BillId},
    },
    messaging::{ConversationId, Message},
    seed,
    storage::{DynStorageGateway, StorageError, StorageKey},
};

pub struct Session {
    user: User,
    groups: Vec<Group>,
    friends: Vec<Friend>,
    conversations: BTreeMap<ConversationId, Vec<Message>>,
    activities: Vec<Activity>,
    bills: Vec<Bill>,
    storage: DynStorageGateway,
}

// Manual impl because the storage gateway trait object is not `Debug`.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("groups", &self.groups)
            .field("friends", &self.friends)
            .field("conversations", &self.conversations)
            .field("activities", &self.activities)
            .field("bills", &self.bills)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Open a session against a store.
    ///
    /// The user identity is loaded from the store, falling back to the
    /// default local identity on first launch. Each collection is then
    /// loaded from its key, or seeded with the first-run data and
    /// persisted when the key has no value yet.
    pub async fn init(storage: DynStorageGateway) -> Result<Self, CoreError> {
        let user: User = match storage.get(StorageKey::User).await? {
            Some(payload) => serde_json::from_str(&payload).map_err(|source| {
                StorageError::Payload {
                    key: StorageKey::User,
                    source,
                }
            })?,
            None => {
                let user = User::default_local();
                let payload = encode(StorageKey::User, &user)?;
                storage.put(StorageKey::User, payload).await?;

                info!(user_id = %user.id, "Stored the default user identity.");

                user
            }
        };

        let now = Utc::now();
        let groups = load_or_seed(&storage, StorageKey::Groups, || seed::groups(&user.id)).await?;
        let friends = load_or_seed(&storage, StorageKey::Friends, seed::friends).await?;
        let conversations = load_or_seed(&storage, StorageKey::Messages, || {
            seed::conversations(&user.id, now)
        })
        .await?;
        let activities = load_or_seed(&storage, StorageKey::Activities, || {
            seed::activities(&user.id, now)
        })
        .await?;
        let bills = load_or_seed(&storage, StorageKey::PendingBills, || {
            seed::pending_bills(&user.id, now)
        })
        .await?;

        info!(user_id = %user.id, "Initialized session.");

        Ok(Self {
            user,
            groups,
            friends,
            conversations,
            activities,
            bills,
            storage,
        })
    }

    /// Flush every collection and the user profile, then close the
    /// session.
    pub async fn teardown(self) -> Result<(), CoreError> {
        self.write(StorageKey::User, &self.user).await?;
        self.write(StorageKey::Groups, &self.groups).await?;
        self.write(StorageKey::Friends, &self.friends).await?;
        self.write(StorageKey::Messages, &self.conversations).await?;
        self.write(StorageKey::Activities, &self.activities).await?;
        self.write(StorageKey::PendingBills, &self.bills).await?;

        info!(user_id = %self.user.id, "Tore down session.");

        Ok(())
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn friends(&self) -> &[Friend] {
        &self.friends
    }

    pub fn bills(&self) -> &[Bill] {
        &self.bills
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn conversations(&self) -> &BTreeMap<ConversationId, Vec<Message>> {
        &self.conversations
    }

    pub fn messages(&self, conversation: &ConversationId) -> Option<&[Message]> {
        self.conversations
            .get(conversation)
            .map(Vec::as_slice)
    }

    pub fn group(&self, id: &GroupId) -> Option<&Group> {
        self.groups.iter().find(|group| group.id == *id)
    }

    pub fn bill(&self, id: &BillId) -> Option<&Bill> {
        self.bills.iter().find(|bill| bill.id == *id)
    }

    /// Serialize a snapshot and write it to the store without touching
    /// in-memory state.
    pub(crate) async fn write<T>(&self, key: StorageKey, value: &T) -> Result<(), CoreError>
    where
        T: Serialize + ?Sized,
    {
        let payload = encode(key, value)?;
        self.storage.put(key, payload).await?;

        Ok(())
    }

    pub(crate) fn commit_user(&mut self, user: User) {
        self.user = user;
    }

    pub(crate) fn commit_groups(&mut self, groups: Vec<Group>) {
        self.groups = groups;
    }

    pub(crate) fn commit_friends(&mut self, friends: Vec<Friend>) {
        self.friends = friends;
    }

    pub(crate) fn commit_conversations(
        &mut self,
        conversations: BTreeMap<ConversationId, Vec<Message>>,
    ) {
        self.conversations = conversations;
    }

    pub(crate) fn commit_activities(&mut self, activities: Vec<Activity>) {
        self.activities = activities;
    }

    pub(crate) fn commit_bills(&mut self, bills: Vec<Bill>) {
        self.bills = bills;
    }
}

fn encode<T>(key: StorageKey, value: &T) -> Result<String, StorageError>
where
    T: Serialize + ?Sized,
{
    serde_json::to_string(value).map_err(|source| StorageError::Payload { key, source })
}

async fn load_or_seed<T, F>(
    storage: &DynStorageGateway,
    key: StorageKey,
    seed: F,
) -> Result<T, CoreError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> T,
{
    match storage.get(key).await? {
        Some(payload) => serde_json::from_str(&payload)
            .map_err(|source| CoreError::from(StorageError::Payload { key, source })),
        None => {
            let value = seed();
            let payload = encode(key, &value)?;
            storage.put(key, payload).await?;

            info!(%key, "Seeded first-run data.");

            Ok(value)
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::storage::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn init_seeds_an_empty_store() {
        let storage: DynStorageGateway = Arc::new(MemoryStore::new());

        let session = Session::init(Arc::clone(&storage)).await.expect("init failed");

        assert_eq!("1", session.user().id.as_str());
        assert_eq!(6, session.groups().len());
        assert_eq!(4, session.friends().len());
        assert_eq!(8, session.bills().len());
        assert_eq!(4, session.activities().len());
        assert_eq!(6, session.conversations().len());

        let stored = storage.get(StorageKey::Groups).await.expect("get failed");
        assert!(stored.is_some(), "seed data should be persisted");
    }

    #[tokio::test]
    async fn init_loads_existing_data_without_reseeding() {
        let storage: DynStorageGateway = Arc::new(MemoryStore::new());
        storage
            .put(StorageKey::Groups, "[]".to_owned())
            .await
            .expect("put failed");

        let session = Session::init(storage).await.expect("init failed");

        assert!(session.groups().is_empty());
        assert_eq!(4, session.friends().len());
    }

    #[tokio::test]
    async fn init_rejects_malformed_payloads() {
        let storage: DynStorageGateway = Arc::new(MemoryStore::new());
        storage
            .put(StorageKey::PendingBills, "not json".to_owned())
            .await
            .expect("put failed");

        let err = Session::init(storage).await.expect_err("init should fail");

        assert!(matches!(
            err,
            CoreError::Persistence(StorageError::Payload {
                key: StorageKey::PendingBills,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn stored_payloads_survive_a_load_store_cycle_unchanged() {
        let storage: DynStorageGateway = Arc::new(MemoryStore::new());
        let session = Session::init(Arc::clone(&storage)).await.expect("init failed");

        let keys = [
            StorageKey::User,
            StorageKey::Groups,
            StorageKey::Friends,
            StorageKey::Messages,
            StorageKey::Activities,
            StorageKey::PendingBills,
        ];

        let mut before = Vec::new();
        for key in keys {
            before.push(storage.get(key).await.expect("get failed"));
        }

        session.teardown().await.expect("teardown failed");

        for (key, want_payload) in keys.into_iter().zip(before) {
            let after = storage.get(key).await.expect("get failed");
            assert_eq!(want_payload, after, "payload for {} changed", key);
        }
    }

    #[tokio::test]
    async fn second_init_sees_the_first_sessions_state() {
        let storage: DynStorageGateway = Arc::new(MemoryStore::new());

        let first = Session::init(Arc::clone(&storage)).await.expect("init failed");
        let want_bills = first.bills().to_vec();
        first.teardown().await.expect("teardown failed");

        let second = Session::init(storage).await.expect("init failed");

        assert_eq!(want_bills, second.bills());
    }
}
