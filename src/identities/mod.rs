//! The authenticated user's profile and the friend directory.
//!
//! Friends are standalone entries. Groups reference them by id and the
//! references are resolved lazily, so removing a friend leaves dangling
//! ids behind. [`ResolvedUser`] makes that case explicit instead of
//! forcing every caller to null-check.

use std::fmt;

use semval::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{CoreError, EntityKind},
    session::Session,
    storage::StorageKey,
};

/// Identifier for a user or a friend.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The user this session belongs to.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub avatar: String,
}

impl User {
    /// The fixed identity used before any profile edits and restored by
    /// [`Session::logout`].
    pub fn default_local() -> Self {
        Self {
            id: UserId::new("1"),
            name: "John Doe".to_owned(),
            email: "john@example.com".to_owned(),
            avatar: avatar_url("John Doe"),
        }
    }
}

/// A person the user splits expenses with.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Friend {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub avatar: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

pub(crate) fn avatar_url(name: &str) -> String {
    format!("https://ui-avatars.com/api/?name={}", name.replace(' ', "+"))
}

/// A validated request to add a friend.
#[derive(Debug)]
pub struct NewFriend {
    id: UserId,
    name: String,
    email: String,
    phone: Option<String>,
}

impl NewFriend {
    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn into_friend(self) -> Friend {
        let avatar = avatar_url(&self.name);

        Friend {
            id: self.id,
            name: self.name,
            email: self.email,
            avatar,
            phone: self.phone,
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum NewFriendInvalidity {
    /// The name is empty after trimming.
    NameEmpty,

    /// The email is empty after trimming.
    EmailEmpty,
}

impl Validate for NewFriend {
    type Invalidity = NewFriendInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new()
            .invalidate_if(self.name.is_empty(), NewFriendInvalidity::NameEmpty)
            .invalidate_if(self.email.is_empty(), NewFriendInvalidity::EmailEmpty)
            .into()
    }
}

/// Unvalidated friend input.
#[derive(Clone, Debug)]
pub struct NewFriendData {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl ValidatedFrom<NewFriendData> for NewFriend {
    fn validated_from(from: NewFriendData) -> ValidatedResult<Self> {
        let into = NewFriend {
            id: UserId::generate(),
            name: from.name.trim().to_owned(),
            email: from.email.trim().to_owned(),
            phone: from.phone,
        };

        match into.validate() {
            Ok(()) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}

/// A patch to the session user's profile. `None` fields are unchanged.
#[derive(Clone, Debug, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

/// The identity behind a user id, looked up against the session user and
/// the friend directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResolvedUser<'a> {
    /// The id belongs to the session user.
    Current(&'a User),

    /// The id belongs to a friend in the directory.
    Known(&'a Friend),

    /// The id is not in the directory. Removed friends leave these
    /// behind; the ledger keeps their history.
    Unknown(&'a UserId),
}

impl ResolvedUser<'_> {
    /// The name to render, with a fixed placeholder for unknown ids.
    pub fn display_name(&self) -> &str {
        match self {
            Self::Current(user) => &user.name,
            Self::Known(friend) => &friend.name,
            Self::Unknown(_) => "Unknown User",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl Session {
    /// Resolve a user id to a display identity.
    pub fn resolve_user<'a>(&'a self, id: &'a UserId) -> ResolvedUser<'a> {
        if self.user().id == *id {
            return ResolvedUser::Current(self.user());
        }

        match self.friends().iter().find(|friend| friend.id == *id) {
            Some(friend) => ResolvedUser::Known(friend),
            None => ResolvedUser::Unknown(id),
        }
    }

    /// Add a friend to the directory.
    pub async fn add_friend(&mut self, data: NewFriendData) -> Result<Friend, CoreError> {
        let new_friend =
            NewFriend::validated_from(data).map_err(|(_, context)| CoreError::validation(context))?;
        let friend = new_friend.into_friend();

        let mut friends = self.friends().to_vec();
        friends.push(friend.clone());

        self.write(StorageKey::Friends, &friends).await?;
        self.commit_friends(friends);

        info!(friend_id = %friend.id, "Added friend.");

        Ok(friend)
    }

    /// Remove a friend from the directory.
    ///
    /// Group member lists are deliberately left untouched; the removed id
    /// resolves to [`ResolvedUser::Unknown`] from here on.
    pub async fn remove_friend(&mut self, id: &UserId) -> Result<(), CoreError> {
        if !self.friends().iter().any(|friend| friend.id == *id) {
            return Err(CoreError::not_found(EntityKind::User, id));
        }

        let friends = self
            .friends()
            .iter()
            .filter(|friend| friend.id != *id)
            .cloned()
            .collect::<Vec<_>>();

        self.write(StorageKey::Friends, &friends).await?;
        self.commit_friends(friends);

        info!(friend_id = %id, "Removed friend.");

        Ok(())
    }

    /// Apply a patch to the session user's profile.
    pub async fn update_profile(&mut self, update: ProfileUpdate) -> Result<(), CoreError> {
        let mut user = self.user().clone();

        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(avatar) = update.avatar {
            user.avatar = avatar;
        }

        self.write(StorageKey::User, &user).await?;
        self.commit_user(user);

        info!(user_id = %self.user().id, "Updated profile.");

        Ok(())
    }

    /// Reset the profile to the default local identity.
    ///
    /// Collections are untouched; only the `user` record is replaced.
    pub async fn logout(&mut self) -> Result<(), CoreError> {
        let user = User::default_local();

        self.write(StorageKey::User, &user).await?;
        self.commit_user(user);

        info!("Reset session user to the default identity.");

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn validated_from_valid() {
        let data = NewFriendData {
            name: "  Dana Hill ".to_owned(),
            email: "dana@example.com".to_owned(),
            phone: None,
        };

        let new_friend = NewFriend::validated_from(data).expect("friend should be valid");

        assert_eq!("Dana Hill", new_friend.name());
    }

    #[test]
    fn validated_from_blank_name() {
        let data = NewFriendData {
            name: "   ".to_owned(),
            email: "dana@example.com".to_owned(),
            phone: None,
        };

        let (_, context) = NewFriend::validated_from(data).expect_err("blank name");
        let errors = context.into_iter().collect::<Vec<_>>();

        assert_eq!(vec![NewFriendInvalidity::NameEmpty], errors);
    }

    #[test]
    fn validated_from_blank_email() {
        let data = NewFriendData {
            name: "Dana Hill".to_owned(),
            email: "".to_owned(),
            phone: None,
        };

        let (_, context) = NewFriend::validated_from(data).expect_err("blank email");
        let errors = context.into_iter().collect::<Vec<_>>();

        assert_eq!(vec![NewFriendInvalidity::EmailEmpty], errors);
    }

    #[test]
    fn avatar_url_encodes_spaces() {
        let want_url = "https://ui-avatars.com/api/?name=Jane+Smith";

        assert_eq!(want_url, avatar_url("Jane Smith"));
    }

    #[test]
    fn unknown_display_name_placeholder() {
        let id = UserId::new("gone");
        let resolved = ResolvedUser::Unknown(&id);

        assert_eq!("Unknown User", resolved.display_name());
        assert!(!resolved.is_known());
    }
}
