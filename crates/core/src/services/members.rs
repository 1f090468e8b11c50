//! Membership operations, including invite-code joins.

use std::sync::Arc;

use domain::models::{GroupAction, GroupMember, GroupRole};
use persistence::repositories::{AddMemberOutcome, GroupMemberRepository, GroupRepository};
use sqlx::PgPool;
use uuid::Uuid;

use crate::capabilities::{Clock, SystemClock};
use crate::error::CoreError;
use crate::services::access;

/// Membership service.
pub struct MemberService {
    groups: GroupRepository,
    members: GroupMemberRepository,
    clock: Arc<dyn Clock>,
}

impl MemberService {
    pub fn new(pool: PgPool) -> Self {
        Self::with_capabilities(pool, Arc::new(SystemClock))
    }

    pub fn with_capabilities(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self {
            groups: GroupRepository::new(pool.clone()),
            members: GroupMemberRepository::new(pool),
            clock,
        }
    }

    /// The caller's active role in a group, if any.
    pub async fn get_role(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<GroupRole>, CoreError> {
        let member = self.members.find_active(group_id, user_id).await?;
        Ok(member.map(|m| m.role.into()))
    }

    /// Lists a group's active members; any member may look.
    pub async fn list_members(
        &self,
        group_id: Uuid,
        acting_user_id: Uuid,
    ) -> Result<Vec<GroupMember>, CoreError> {
        let group = self
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or(CoreError::NotFound("group"))?;
        access::require(&self.members, &group, acting_user_id, GroupAction::ViewLists).await?;

        let members = self.members.list_active(group_id).await?;
        Ok(members.into_iter().map(Into::into).collect())
    }

    /// Adds a user directly with the given role (Owner excluded; ownership
    /// only moves via transfer).
    pub async fn add_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: GroupRole,
        acting_user_id: Uuid,
    ) -> Result<GroupMember, CoreError> {
        if role == GroupRole::Owner {
            return Err(CoreError::Validation(
                "a member cannot be added with the owner role".to_string(),
            ));
        }
        let group = self
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or(CoreError::NotFound("group"))?;
        access::require(&self.members, &group, acting_user_id, GroupAction::ManageGroup).await?;

        let now = self.clock.now();
        let outcome = self
            .members
            .add_member(
                group_id,
                user_id,
                role.into(),
                Some(acting_user_id),
                Some(acting_user_id),
                now,
            )
            .await?;
        map_add_outcome(outcome)
    }

    /// Changes an active member's role. The owner's row is immutable here.
    pub async fn set_role(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: GroupRole,
        acting_user_id: Uuid,
    ) -> Result<GroupMember, CoreError> {
        if role == GroupRole::Owner {
            return Err(CoreError::Validation(
                "ownership only moves via transfer".to_string(),
            ));
        }
        let group = self
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or(CoreError::NotFound("group"))?;
        if user_id == group.owner_id {
            return Err(CoreError::PermissionDenied(
                "the owner's role cannot be changed",
            ));
        }
        access::require(&self.members, &group, acting_user_id, GroupAction::ManageGroup).await?;

        let now = self.clock.now();
        let member = self
            .members
            .set_role(group_id, user_id, role.into(), Some(acting_user_id), now)
            .await?
            .ok_or(CoreError::NotFound("member"))?;
        Ok(member.into())
    }

    /// Removes a member. Members may leave on their own; removing someone
    /// else requires group management rights. The owner is never removable.
    pub async fn remove_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        acting_user_id: Uuid,
    ) -> Result<(), CoreError> {
        let group = self
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or(CoreError::NotFound("group"))?;
        if user_id == group.owner_id {
            return Err(CoreError::PermissionDenied(
                "the owner cannot be removed; transfer ownership or delete the group",
            ));
        }
        if user_id != acting_user_id {
            access::require(&self.members, &group, acting_user_id, GroupAction::ManageGroup)
                .await?;
        }

        let now = self.clock.now();
        if !self
            .members
            .remove(group_id, user_id, Some(acting_user_id), now)
            .await?
        {
            return Err(CoreError::NotFound("member"));
        }
        Ok(())
    }

    /// Joins a group via its shareable invite code, as a plain Member.
    pub async fn join_by_code(&self, code: &str, user_id: Uuid) -> Result<GroupMember, CoreError> {
        let group = self
            .groups
            .find_by_invite_code(code)
            .await?
            .ok_or(CoreError::NotFound("invite code"))?;

        let now = self.clock.now();
        if !group.invite_code_usable(now) {
            return Err(CoreError::Expired);
        }

        let outcome = self
            .members
            .add_member(
                group.id,
                user_id,
                GroupRole::Member.into(),
                None,
                Some(user_id),
                now,
            )
            .await?;
        map_add_outcome(outcome)
    }

    /// Stamps the member's last activity timestamp. Best effort; missing
    /// membership is ignored.
    pub async fn touch_activity(&self, group_id: Uuid, user_id: Uuid) -> Result<(), CoreError> {
        let now = self.clock.now();
        self.members.touch_activity(group_id, user_id, now).await?;
        Ok(())
    }
}

fn map_add_outcome(outcome: AddMemberOutcome) -> Result<GroupMember, CoreError> {
    match outcome {
        AddMemberOutcome::Added(member) => Ok(member.into()),
        AddMemberOutcome::AlreadyMember => Err(CoreError::Duplicate("already a member")),
        AddMemberOutcome::CapacityReached { max_members } => {
            Err(CoreError::Capacity { max_members })
        }
        AddMemberOutcome::GroupNotFound => Err(CoreError::NotFound("group")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::models::{AuditInfo, Tombstone};
    use persistence::entities::{GroupMemberEntity, GroupRoleDb};

    fn member_entity(role: GroupRoleDb) -> GroupMemberEntity {
        let now = Utc::now();
        GroupMemberEntity {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role,
            joined_at: now,
            invited_by: None,
            last_activity_at: None,
            audit: AuditInfo::on_insert(now, None),
            tombstone: Tombstone::live(),
        }
    }

    #[test]
    fn test_map_add_outcome_added() {
        let outcome = AddMemberOutcome::Added(member_entity(GroupRoleDb::Member));
        assert!(map_add_outcome(outcome).is_ok());
    }

    #[test]
    fn test_map_add_outcome_duplicate() {
        assert!(matches!(
            map_add_outcome(AddMemberOutcome::AlreadyMember),
            Err(CoreError::Duplicate(_))
        ));
    }

    #[test]
    fn test_map_add_outcome_capacity_carries_cap() {
        match map_add_outcome(AddMemberOutcome::CapacityReached { max_members: 10 }) {
            Err(CoreError::Capacity { max_members }) => assert_eq!(max_members, 10),
            other => panic!("expected Capacity, got {:?}", other.err()),
        }
    }
}
