//! Group lifecycle operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain::models::{
    CreateGroupRequest, Group, GroupAction, UpdateGroupRequest, DEFAULT_MAX_MEMBERS,
};
use persistence::repositories::{GroupMemberRepository, GroupRepository};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::capabilities::{Clock, OpaqueTokenIssuer, SystemClock, TokenIssuer};
use crate::error::CoreError;
use crate::services::access;

/// Attempts at minting a unique invite code before giving up.
const INVITE_CODE_ATTEMPTS: usize = 3;

/// Group lifecycle service.
pub struct GroupService {
    groups: GroupRepository,
    members: GroupMemberRepository,
    clock: Arc<dyn Clock>,
    tokens: Arc<dyn TokenIssuer>,
}

impl GroupService {
    pub fn new(pool: PgPool) -> Self {
        Self::with_capabilities(pool, Arc::new(SystemClock), Arc::new(OpaqueTokenIssuer))
    }

    pub fn with_capabilities(
        pool: PgPool,
        clock: Arc<dyn Clock>,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self {
            groups: GroupRepository::new(pool.clone()),
            members: GroupMemberRepository::new(pool),
            clock,
            tokens,
        }
    }

    /// Creates a group; the creator becomes its sole Owner member and an
    /// invite code is minted.
    pub async fn create_group(
        &self,
        owner_id: Uuid,
        request: CreateGroupRequest,
    ) -> Result<Group, CoreError> {
        request.validate()?;
        let now = self.clock.now();
        let max_members = request.max_members.unwrap_or(DEFAULT_MAX_MEMBERS);

        // The invite code namespace is a global unique index; regenerate on
        // the (unlikely) collision instead of failing the command.
        let mut last_err = None;
        for _ in 0..INVITE_CODE_ATTEMPTS {
            let code = self.tokens.invite_code();
            match self
                .groups
                .create(
                    &request.name,
                    request.description.as_deref(),
                    owner_id,
                    max_members,
                    &code,
                    now,
                )
                .await
            {
                Ok((group, _owner)) => {
                    tracing::info!(group_id = %group.id, %owner_id, "group created");
                    return Ok(group.into());
                }
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    last_err = Some(sqlx::Error::Database(db));
                }
                Err(other) => return Err(other.into()),
            }
        }
        Err(last_err
            .map(CoreError::from)
            .unwrap_or(CoreError::Internal("invite code generation failed".into())))
    }

    /// Fetches a group the caller belongs to.
    pub async fn get_group(&self, group_id: Uuid, acting_user_id: Uuid) -> Result<Group, CoreError> {
        let group = self
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or(CoreError::NotFound("group"))?;
        access::require(&self.members, &group, acting_user_id, GroupAction::ViewLists).await?;
        Ok(group.into())
    }

    /// Lists the groups the user is an active member of.
    pub async fn list_groups(&self, user_id: Uuid) -> Result<Vec<Group>, CoreError> {
        let groups = self.groups.list_for_user(user_id).await?;
        Ok(groups.into_iter().map(Into::into).collect())
    }

    /// Updates group settings. Lowering `max_members` below the current
    /// active member count is rejected.
    pub async fn update_group(
        &self,
        group_id: Uuid,
        acting_user_id: Uuid,
        request: UpdateGroupRequest,
    ) -> Result<Group, CoreError> {
        request.validate()?;
        let group = self
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or(CoreError::NotFound("group"))?;
        access::require(&self.members, &group, acting_user_id, GroupAction::ManageGroup).await?;

        let now = self.clock.now();
        let updated = self
            .groups
            .update_settings(
                group_id,
                request.name.as_deref(),
                request.description.as_deref(),
                request.allow_members_to_invite,
                request.max_members,
                Some(acting_user_id),
                now,
            )
            .await?
            .ok_or(CoreError::NotFound("group"))?;

        match updated {
            Ok(group) => Ok(group.into()),
            Err(active_count) => Err(CoreError::Validation(format!(
                "max_members cannot be below the current member count ({})",
                active_count
            ))),
        }
    }

    /// Tombstones a group and everything in it. Owner only.
    pub async fn delete_group(
        &self,
        group_id: Uuid,
        acting_user_id: Uuid,
    ) -> Result<(), CoreError> {
        let group = self
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or(CoreError::NotFound("group"))?;
        if group.owner_id != acting_user_id {
            return Err(CoreError::PermissionDenied(
                "only the owner can delete a group",
            ));
        }

        let now = self.clock.now();
        if !self
            .groups
            .soft_delete_cascade(group_id, Some(acting_user_id), now)
            .await?
        {
            return Err(CoreError::NotFound("group"));
        }
        Ok(())
    }

    /// Replaces the shareable invite code, optionally with an expiry.
    pub async fn rotate_invite_code(
        &self,
        group_id: Uuid,
        acting_user_id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Group, CoreError> {
        let group = self
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or(CoreError::NotFound("group"))?;
        access::require(&self.members, &group, acting_user_id, GroupAction::ManageGroup).await?;

        let now = self.clock.now();
        let mut last_err = None;
        for _ in 0..INVITE_CODE_ATTEMPTS {
            let code = self.tokens.invite_code();
            match self
                .groups
                .rotate_invite_code(group_id, &code, expires_at, Some(acting_user_id), now)
                .await
            {
                Ok(Some(group)) => return Ok(group.into()),
                Ok(None) => return Err(CoreError::NotFound("group")),
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    last_err = Some(sqlx::Error::Database(db));
                }
                Err(other) => return Err(other.into()),
            }
        }
        Err(last_err
            .map(CoreError::from)
            .unwrap_or(CoreError::Internal("invite code generation failed".into())))
    }

    /// Hands the Owner role to another active member; the previous owner
    /// becomes an Admin.
    pub async fn transfer_ownership(
        &self,
        group_id: Uuid,
        acting_user_id: Uuid,
        new_owner_id: Uuid,
    ) -> Result<(), CoreError> {
        let group = self
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or(CoreError::NotFound("group"))?;
        if group.owner_id != acting_user_id {
            return Err(CoreError::PermissionDenied(
                "only the owner can transfer ownership",
            ));
        }
        if new_owner_id == acting_user_id {
            return Err(CoreError::Validation(
                "cannot transfer ownership to yourself".to_string(),
            ));
        }
        if self
            .members
            .find_active(group_id, new_owner_id)
            .await?
            .is_none()
        {
            return Err(CoreError::NotFound("member"));
        }

        let now = self.clock.now();
        if !self
            .groups
            .transfer_ownership(group_id, acting_user_id, new_owner_id, now)
            .await?
        {
            return Err(CoreError::NotFound("member"));
        }
        tracing::info!(%group_id, %new_owner_id, "group ownership transferred");
        Ok(())
    }
}
