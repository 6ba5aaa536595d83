use std::fmt;

use semval::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{identities::UserId, ledger::domain::money::Money};

/// Identifier for a group.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
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

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A set of people splitting expenses together.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub members: Vec<UserId>,
    pub admins: Vec<UserId>,
    pub created_by: UserId,
    /// Lifetime gross of every expense recorded against the group. Never
    /// reduced, not even when bills are settled.
    pub total_expenses: Money,
}

impl Group {
    /// Whether a user may perform admin-gated changes.
    ///
    /// The creator keeps admin rights even when absent from the explicit
    /// admin list.
    pub fn is_admin(&self, user: &UserId) -> bool {
        self.admins.contains(user) || self.created_by == *user
    }

    pub fn is_member(&self, user: &UserId) -> bool {
        self.members.contains(user)
    }
}

/// A group name that has passed validation.
#[derive(Debug)]
pub struct GroupName(String);

impl GroupName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum GroupNameInvalidity {
    /// The name is empty after trimming.
    Empty,
}

impl Validate for GroupName {
    type Invalidity = GroupNameInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new()
            .invalidate_if(self.0.is_empty(), GroupNameInvalidity::Empty)
            .into()
    }
}

impl ValidatedFrom<&str> for GroupName {
    fn validated_from(from: &str) -> ValidatedResult<Self> {
        let into = Self(from.trim().to_owned());

        match into.validate() {
            Ok(()) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}
