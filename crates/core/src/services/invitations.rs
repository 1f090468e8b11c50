//! Invitation workflow: issue, accept, decline, revoke.
//!
//! Expiry is lazy: any decision against a pending invitation past its
//! `expires_at` stores the `Expired` status and rejects the attempt. Terminal
//! statuses never change again.

use std::sync::Arc;

use chrono::Duration;
use domain::models::{
    CreateInvitationRequest, GroupAction, GroupMember, Invitation, InvitationResolution,
    InvitationStatus,
};
use persistence::entities::InvitationStatusDb;
use persistence::repositories::{
    AcceptOutcome, GroupMemberRepository, GroupRepository, InvitationRepository,
    InvitationSummary, ResolveOutcome, UserRepository,
};
use shared::pagination::{PageParams, Paginated, Pagination};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::capabilities::{
    Clock, LoggingNotifier, Notifier, OpaqueTokenIssuer, SystemClock, TokenIssuer,
};
use crate::config::InvitationConfig;
use crate::error::CoreError;
use crate::services::access;

/// Attempts at minting a unique invitation token before giving up.
const TOKEN_ATTEMPTS: usize = 3;

/// Invitation workflow service.
pub struct InvitationService {
    groups: GroupRepository,
    members: GroupMemberRepository,
    invitations: InvitationRepository,
    users: UserRepository,
    expiry_days: i64,
    clock: Arc<dyn Clock>,
    tokens: Arc<dyn TokenIssuer>,
    notifier: Arc<dyn Notifier>,
}

impl InvitationService {
    pub fn new(pool: PgPool, policy: &InvitationConfig) -> Self {
        Self::with_capabilities(
            pool,
            policy,
            Arc::new(SystemClock),
            Arc::new(OpaqueTokenIssuer),
            Arc::new(LoggingNotifier),
        )
    }

    pub fn with_capabilities(
        pool: PgPool,
        policy: &InvitationConfig,
        clock: Arc<dyn Clock>,
        tokens: Arc<dyn TokenIssuer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            groups: GroupRepository::new(pool.clone()),
            members: GroupMemberRepository::new(pool.clone()),
            invitations: InvitationRepository::new(pool.clone()),
            users: UserRepository::new(pool),
            expiry_days: policy.expiry_days,
            clock,
            tokens,
            notifier,
        }
    }

    /// Issues a pending invitation and notifies the invitee.
    pub async fn invite_member(
        &self,
        group_id: Uuid,
        invited_by: Uuid,
        request: CreateInvitationRequest,
    ) -> Result<Invitation, CoreError> {
        request.validate()?;

        let group = self
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or(CoreError::NotFound("group"))?;
        access::require(&self.members, &group, invited_by, GroupAction::InviteMembers).await?;

        let now = self.clock.now();
        let invited_user = self.users.find_by_email(&request.invited_email).await?;
        if let Some(ref user) = invited_user {
            if self.members.find_active(group_id, user.id).await?.is_some() {
                return Err(CoreError::Duplicate("already a member"));
            }
        }
        if self
            .invitations
            .has_pending_for_email(group_id, &request.invited_email, now)
            .await?
        {
            return Err(CoreError::Duplicate("invitation already pending"));
        }

        let expires_at = now + Duration::days(self.expiry_days);
        let mut last_err = None;
        for _ in 0..TOKEN_ATTEMPTS {
            let token = self.tokens.invitation_token();
            match self
                .invitations
                .create(
                    group_id,
                    &request.invited_email,
                    invited_user.as_ref().map(|u| u.id),
                    invited_by,
                    &token,
                    expires_at,
                    request.message.as_deref(),
                    now,
                )
                .await
            {
                Ok(invitation) => {
                    self.notifier
                        .send_invitation(&invitation.invited_email, &invitation.token)
                        .await;
                    tracing::info!(invitation_id = %invitation.id, %group_id, "invitation issued");
                    return Ok(invitation.into());
                }
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    last_err = Some(sqlx::Error::Database(db));
                }
                Err(other) => return Err(other.into()),
            }
        }
        Err(last_err
            .map(CoreError::from)
            .unwrap_or(CoreError::Internal("token generation failed".into())))
    }

    /// Consumes an invitation token and adds the user to the group.
    pub async fn accept_invitation(
        &self,
        token: &str,
        user_id: Uuid,
    ) -> Result<GroupMember, CoreError> {
        let now = self.clock.now();
        match self.invitations.accept(token, user_id, now).await? {
            AcceptOutcome::Accepted { invitation, member } => {
                tracing::info!(
                    invitation_id = %invitation.id,
                    group_id = %invitation.group_id,
                    %user_id,
                    "invitation accepted"
                );
                Ok(member.into())
            }
            AcceptOutcome::NotFound => Err(CoreError::NotFound("invitation")),
            AcceptOutcome::Lapsed => Err(CoreError::Expired),
            AcceptOutcome::AlreadyResolved(status) => {
                Err(CoreError::AlreadyResolved(status.into()))
            }
            AcceptOutcome::AlreadyMember => Err(CoreError::Duplicate("already a member")),
            AcceptOutcome::CapacityReached { max_members } => {
                Err(CoreError::Capacity { max_members })
            }
            AcceptOutcome::GroupGone => Err(CoreError::NotFound("group")),
        }
    }

    /// Declines a pending invitation by token.
    pub async fn decline_invitation(&self, token: &str, user_id: Uuid) -> Result<(), CoreError> {
        let invitation = self
            .invitations
            .find_by_token(token)
            .await?
            .ok_or(CoreError::NotFound("invitation"))?;
        self.settle(invitation.into(), InvitationStatus::Declined, Some(user_id))
            .await
    }

    /// Revokes a pending invitation; requires group management rights.
    pub async fn revoke_invitation(
        &self,
        token: &str,
        acting_user_id: Uuid,
    ) -> Result<(), CoreError> {
        let invitation = self
            .invitations
            .find_by_token(token)
            .await?
            .ok_or(CoreError::NotFound("invitation"))?;
        let group = self
            .groups
            .find_by_id(invitation.group_id)
            .await?
            .ok_or(CoreError::NotFound("group"))?;
        access::require(&self.members, &group, acting_user_id, GroupAction::ManageGroup).await?;

        self.settle(
            invitation.into(),
            InvitationStatus::Revoked,
            Some(acting_user_id),
        )
        .await
    }

    /// Applies a terminal decision, honoring lazy expiry and the
    /// first-writer-wins guard on the pending status.
    async fn settle(
        &self,
        invitation: Invitation,
        status: InvitationStatus,
        acting_user_id: Option<Uuid>,
    ) -> Result<(), CoreError> {
        let now = self.clock.now();
        match invitation.resolution(now) {
            InvitationResolution::Resolvable => {
                match self
                    .invitations
                    .resolve(invitation.id, status.into(), acting_user_id, now)
                    .await?
                {
                    ResolveOutcome::Resolved(_) => Ok(()),
                    ResolveOutcome::NotPending(current) => {
                        Err(CoreError::AlreadyResolved(current.into()))
                    }
                    ResolveOutcome::NotFound => Err(CoreError::NotFound("invitation")),
                }
            }
            InvitationResolution::LapsedPending => {
                // Store the lapse before rejecting the attempt.
                let _ = self
                    .invitations
                    .resolve(invitation.id, InvitationStatusDb::Expired, None, now)
                    .await?;
                Err(CoreError::Expired)
            }
            InvitationResolution::AlreadyResolved(current) => {
                Err(CoreError::AlreadyResolved(current))
            }
        }
    }

    /// Lists a group's invitations, optionally filtered by status.
    pub async fn list_invitations(
        &self,
        group_id: Uuid,
        acting_user_id: Uuid,
        status: Option<InvitationStatus>,
        page: PageParams,
    ) -> Result<Paginated<Invitation>, CoreError> {
        let group = self
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or(CoreError::NotFound("group"))?;
        access::require(
            &self.members,
            &group,
            acting_user_id,
            GroupAction::InviteMembers,
        )
        .await?;

        let summary = self.invitations.summary(group_id).await?;
        let total = match status {
            Some(InvitationStatus::Pending) => summary.pending,
            Some(InvitationStatus::Accepted) => summary.accepted,
            Some(InvitationStatus::Declined) => summary.declined,
            Some(InvitationStatus::Expired) => summary.expired,
            Some(InvitationStatus::Revoked) => summary.revoked,
            None => {
                summary.pending
                    + summary.accepted
                    + summary.declined
                    + summary.expired
                    + summary.revoked
            }
        };

        let rows = self
            .invitations
            .list_by_group(
                group_id,
                status.map(Into::into),
                page.per_page(),
                page.offset(),
            )
            .await?;
        Ok(Paginated {
            items: rows.into_iter().map(Into::into).collect(),
            pagination: Pagination::new(page.page(), page.per_page(), total),
        })
    }

    /// Per-status counts of a group's invitations.
    pub async fn invitation_summary(
        &self,
        group_id: Uuid,
        acting_user_id: Uuid,
    ) -> Result<InvitationSummary, CoreError> {
        let group = self
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or(CoreError::NotFound("group"))?;
        access::require(
            &self.members,
            &group,
            acting_user_id,
            GroupAction::InviteMembers,
        )
        .await?;
        Ok(self.invitations.summary(group_id).await?)
    }
}
