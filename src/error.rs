use std::fmt;

use thiserror::Error;

use crate::{groups::GroupId, identities::UserId, storage::StorageError};

/// The kind of entity a failed lookup was searching for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntityKind {
    Bill,
    Conversation,
    Group,
    User,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bill => "bill",
            Self::Conversation => "conversation",
            Self::Group => "group",
            Self::User => "user",
        };

        write!(f, "{}", name)
    }
}

/// Any failure surfaced by a session operation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The provided input is invalid. The operation was not attempted and
    /// no state changed.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A referenced entity does not exist. No partial writes occurred.
    #[error("{kind} {id} does not exist")]
    NotFound { kind: EntityKind, id: String },

    /// The acting user does not have the admin rights the operation
    /// requires.
    #[error("user {user} is not an admin of group {group}")]
    Authorization { user: UserId, group: GroupId },

    /// A storage operation failed. In-memory state was left as it was
    /// before the call.
    #[error(transparent)]
    Persistence(#[from] StorageError),
}

impl CoreError {
    pub(crate) fn not_found(kind: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn validation<V: fmt::Debug + 'static>(context: semval::context::Context<V>) -> Self {
        let issues = context.into_iter().collect::<Vec<_>>();

        Self::Validation(format!("{:?}", issues))
    }
}
