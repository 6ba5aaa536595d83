//! Group membership transitions.
//!
//! Changing an existing group requires the actor to be a listed admin
//! or the group's creator; leaving is the one exception, open to any
//! member. Successful changes post exactly one system notice into the
//! group's conversation, except creation (which starts the conversation
//! empty) and deletion (which removes it). Failed calls post nothing
//! and write nothing.

use chrono::Utc;
use semval::ValidatedFrom;
use tracing::info;

use crate::{
    error::{CoreError, EntityKind},
    groups::{Group, GroupId, GroupName},
    identities::UserId,
    ledger::domain::money::Money,
    messaging::{ConversationId, Message},
    session::Session,
    storage::StorageKey,
};

/// What [`Session::leave_group`] did.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LeaveOutcome {
    /// The actor left; the remaining members keep the group.
    Left,

    /// The actor is the only member. Nothing was changed; deleting the
    /// group is the way out.
    DeletionRequired,
}

impl Session {
    /// Create a group with the session user as creator, first member,
    /// and sole listed admin.
    ///
    /// Invited ids join the member list after the creator, skipping
    /// duplicates. An empty conversation is initialized for the group.
    pub async fn create_group(
        &mut self,
        name: &str,
        description: Option<String>,
        invited: Vec<UserId>,
    ) -> Result<Group, CoreError> {
        let name =
            GroupName::validated_from(name).map_err(|(_, context)| CoreError::validation(context))?;

        let creator = self.user().id.clone();
        let mut members = vec![creator.clone()];
        for user in invited {
            if !members.contains(&user) {
                members.push(user);
            }
        }

        let group = Group {
            id: GroupId::generate(),
            name: name.into_inner(),
            description,
            members,
            admins: vec![creator.clone()],
            created_by: creator,
            total_expenses: Money::ZERO,
        };

        let mut groups = self.groups().to_vec();
        groups.push(group.clone());

        let mut conversations = self.conversations().clone();
        conversations.insert(ConversationId::for_group(&group.id), Vec::new());

        self.write(StorageKey::Groups, &groups).await?;
        self.write(StorageKey::Messages, &conversations).await?;
        self.commit_groups(groups);
        self.commit_conversations(conversations);

        info!(group_id = %group.id, "Created group.");

        Ok(group)
    }

    /// Add members to a group.
    ///
    /// Ids already in the group are skipped; when nothing new remains
    /// the call is a no-op. Ids do not have to exist in the friend
    /// directory.
    pub async fn add_members(
        &mut self,
        group_id: &GroupId,
        actor: &UserId,
        users: Vec<UserId>,
    ) -> Result<(), CoreError> {
        let position = self.admin_guarded(group_id, actor)?;

        if users.is_empty() {
            return Err(CoreError::Validation("no members were selected".to_owned()));
        }

        let mut groups = self.groups().to_vec();
        let group = &mut groups[position];

        let mut added: Vec<UserId> = Vec::new();
        for user in users {
            if !group.members.contains(&user) && !added.contains(&user) {
                added.push(user);
            }
        }

        if added.is_empty() {
            return Ok(());
        }

        group.members.extend(added.iter().cloned());

        let names: Vec<String> = added
            .iter()
            .map(|id| self.resolve_user(id).display_name().to_owned())
            .collect();
        let verb = if added.len() > 1 { "have" } else { "has" };
        let text = format!("{} {} been added to the group", names_list(&names), verb);

        let mut conversations = self.conversations().clone();
        conversations
            .entry(ConversationId::for_group(group_id))
            .or_default()
            .push(Message::system(text, Utc::now()));

        self.write(StorageKey::Groups, &groups).await?;
        self.write(StorageKey::Messages, &conversations).await?;
        self.commit_groups(groups);
        self.commit_conversations(conversations);

        info!(group_id = %group_id, added = added.len(), "Added group members.");

        Ok(())
    }

    /// Remove a member from a group, dropping any admin role they held.
    ///
    /// Leaving is the way to remove yourself; the creator reassignment
    /// that leaving performs does not happen here.
    pub async fn remove_member(
        &mut self,
        group_id: &GroupId,
        actor: &UserId,
        member: &UserId,
    ) -> Result<(), CoreError> {
        let position = self.admin_guarded(group_id, actor)?;

        if member == actor {
            return Err(CoreError::Validation(
                "cannot remove yourself; leave the group instead".to_owned(),
            ));
        }

        if !self.groups()[position].is_member(member) {
            return Err(CoreError::not_found(EntityKind::User, member));
        }

        let mut groups = self.groups().to_vec();
        let group = &mut groups[position];
        group.members.retain(|id| id != member);
        group.admins.retain(|id| id != member);

        let name = self.resolve_user(member).display_name().to_owned();
        let text = format!("{} has been removed from the group", name);

        let mut conversations = self.conversations().clone();
        conversations
            .entry(ConversationId::for_group(group_id))
            .or_default()
            .push(Message::system(text, Utc::now()));

        self.write(StorageKey::Groups, &groups).await?;
        self.write(StorageKey::Messages, &conversations).await?;
        self.commit_groups(groups);
        self.commit_conversations(conversations);

        info!(group_id = %group_id, member = %member, "Removed group member.");

        Ok(())
    }

    /// Flip a member's presence in the admin list.
    ///
    /// Returns whether the member is a listed admin afterwards. The
    /// creator can be toggled out of the list but keeps implicit admin
    /// rights regardless.
    pub async fn toggle_admin(
        &mut self,
        group_id: &GroupId,
        actor: &UserId,
        member: &UserId,
    ) -> Result<bool, CoreError> {
        let position = self.admin_guarded(group_id, actor)?;

        if !self.groups()[position].is_member(member) {
            return Err(CoreError::not_found(EntityKind::User, member));
        }

        let mut groups = self.groups().to_vec();
        let group = &mut groups[position];

        let was_admin = group.admins.contains(member);
        if was_admin {
            group.admins.retain(|id| id != member);
        } else {
            group.admins.push(member.clone());
        }
        let is_admin_now = !was_admin;

        let name = self.resolve_user(member).display_name().to_owned();
        let text = if is_admin_now {
            format!("{} is now an admin", name)
        } else {
            format!("{} is no longer an admin", name)
        };

        let mut conversations = self.conversations().clone();
        conversations
            .entry(ConversationId::for_group(group_id))
            .or_default()
            .push(Message::system(text, Utc::now()));

        self.write(StorageKey::Groups, &groups).await?;
        self.write(StorageKey::Messages, &conversations).await?;
        self.commit_groups(groups);
        self.commit_conversations(conversations);

        info!(
            group_id = %group_id,
            member = %member,
            admin = is_admin_now,
            "Toggled admin role."
        );

        Ok(is_admin_now)
    }

    /// Rename a group.
    pub async fn rename_group(
        &mut self,
        group_id: &GroupId,
        actor: &UserId,
        new_name: &str,
    ) -> Result<(), CoreError> {
        let position = self.admin_guarded(group_id, actor)?;

        let name = GroupName::validated_from(new_name)
            .map_err(|(_, context)| CoreError::validation(context))?;

        let mut groups = self.groups().to_vec();
        groups[position].name = name.as_str().to_owned();

        let text = format!("Group name has been changed to \"{}\"", name.as_str());

        let mut conversations = self.conversations().clone();
        conversations
            .entry(ConversationId::for_group(group_id))
            .or_default()
            .push(Message::system(text, Utc::now()));

        self.write(StorageKey::Groups, &groups).await?;
        self.write(StorageKey::Messages, &conversations).await?;
        self.commit_groups(groups);
        self.commit_conversations(conversations);

        info!(group_id = %group_id, "Renamed group.");

        Ok(())
    }

    /// Leave a group.
    ///
    /// A leaving creator hands the creator role to the first remaining
    /// listed admin, or the first remaining member when no other admin
    /// exists. The sole member of a group cannot leave it; the call
    /// reports that deletion is required and changes nothing.
    pub async fn leave_group(
        &mut self,
        group_id: &GroupId,
        actor: &UserId,
    ) -> Result<LeaveOutcome, CoreError> {
        let position = self
            .groups()
            .iter()
            .position(|group| group.id == *group_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Group, group_id))?;

        if !self.groups()[position].is_member(actor) {
            return Err(CoreError::not_found(EntityKind::User, actor));
        }

        if self.groups()[position].members.len() == 1 {
            return Ok(LeaveOutcome::DeletionRequired);
        }

        let mut groups = self.groups().to_vec();
        let group = &mut groups[position];

        if group.created_by == *actor {
            let next = group
                .admins
                .iter()
                .find(|id| *id != actor)
                .or_else(|| group.members.iter().find(|id| *id != actor))
                .cloned();
            if let Some(next) = next {
                group.created_by = next;
            }
        }

        group.members.retain(|id| id != actor);
        group.admins.retain(|id| id != actor);

        let name = self.resolve_user(actor).display_name().to_owned();
        let text = format!("{} has left the group", name);

        let mut conversations = self.conversations().clone();
        conversations
            .entry(ConversationId::for_group(group_id))
            .or_default()
            .push(Message::system(text, Utc::now()));

        self.write(StorageKey::Groups, &groups).await?;
        self.write(StorageKey::Messages, &conversations).await?;
        self.commit_groups(groups);
        self.commit_conversations(conversations);

        info!(group_id = %group_id, user = %actor, "Left group.");

        Ok(LeaveOutcome::Left)
    }

    /// Delete a group and its conversation.
    ///
    /// Bills and activities that reference the group are kept; their
    /// conversation ids resolve to nothing from here on, the same
    /// tombstone policy applied to removed friends.
    pub async fn delete_group(
        &mut self,
        group_id: &GroupId,
        actor: &UserId,
    ) -> Result<(), CoreError> {
        self.admin_guarded(group_id, actor)?;

        let groups = self
            .groups()
            .iter()
            .filter(|group| group.id != *group_id)
            .cloned()
            .collect::<Vec<_>>();

        let mut conversations = self.conversations().clone();
        conversations.remove(&ConversationId::for_group(group_id));

        self.write(StorageKey::Groups, &groups).await?;
        self.write(StorageKey::Messages, &conversations).await?;
        self.commit_groups(groups);
        self.commit_conversations(conversations);

        info!(group_id = %group_id, "Deleted group.");

        Ok(())
    }

    fn admin_guarded(&self, group_id: &GroupId, actor: &UserId) -> Result<usize, CoreError> {
        let position = self
            .groups()
            .iter()
            .position(|group| group.id == *group_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Group, group_id))?;

        if !self.groups()[position].is_admin(actor) {
            return Err(CoreError::Authorization {
                user: actor.clone(),
                group: group_id.clone(),
            });
        }

        Ok(position)
    }
}

fn names_list(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{} and {}", first, second),
        [head @ .., last] => format!("{}, and {}", head.join(", "), last),
    }
}
