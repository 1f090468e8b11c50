//! Repository for invitation database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{GroupMemberEntity, InvitationEntity, InvitationStatusDb};
use crate::metrics::QueryTimer;

const INVITATION_COLUMNS: &str = "id, group_id, invited_email, invited_user_id, invited_by, \
     status, token, expires_at, message, responded_at, \
     created_at, created_by, updated_at, updated_by, is_deleted, deleted_at, deleted_by";

const MEMBER_COLUMNS: &str = "id, group_id, user_id, role, joined_at, invited_by, last_activity_at, \
     created_at, created_by, updated_at, updated_by, is_deleted, deleted_at, deleted_by";

/// Result of a conditional status transition on a pending invitation.
#[derive(Debug)]
pub enum ResolveOutcome {
    /// The transition was applied.
    Resolved(InvitationEntity),
    /// The invitation is no longer pending; carries the current status.
    NotPending(InvitationStatusDb),
    /// No live invitation with that id exists.
    NotFound,
}

/// Result of accepting an invitation by token.
#[derive(Debug)]
pub enum AcceptOutcome {
    /// The invitation was consumed and a membership created.
    Accepted {
        invitation: InvitationEntity,
        member: GroupMemberEntity,
    },
    /// No live invitation with that token exists.
    NotFound,
    /// The invitation was pending but past its expiry; it has been marked
    /// expired as a side effect.
    Lapsed,
    /// The invitation was already resolved; carries the recorded status.
    AlreadyResolved(InvitationStatusDb),
    /// The user is already an active member of the group.
    AlreadyMember,
    /// The group is at its `max_members` cap.
    CapacityReached { max_members: i32 },
    /// The group was deleted after the invitation was issued.
    GroupGone,
}

/// Per-status counts for a group's invitations.
#[derive(Debug, Default, Clone, Copy)]
pub struct InvitationSummary {
    pub pending: i64,
    pub accepted: i64,
    pub declined: i64,
    pub expired: i64,
    pub revoked: i64,
}

/// Repository for invitation operations.
#[derive(Clone)]
pub struct InvitationRepository {
    pool: PgPool,
}

impl InvitationRepository {
    /// Creates a new invitation repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a pending invitation.
    pub async fn create(
        &self,
        group_id: Uuid,
        invited_email: &str,
        invited_user_id: Option<Uuid>,
        invited_by: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
        message: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<InvitationEntity, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO invitations (group_id, invited_email, invited_user_id, invited_by,
                                     token, expires_at, message,
                                     created_at, created_by, updated_at, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $4, $8, $4)
            RETURNING {INVITATION_COLUMNS}
            "#
        );
        sqlx::query_as::<_, InvitationEntity>(&query)
            .bind(group_id)
            .bind(invited_email)
            .bind(invited_user_id)
            .bind(invited_by)
            .bind(token)
            .bind(expires_at)
            .bind(message)
            .bind(now)
            .fetch_one(&self.pool)
            .await
    }

    /// Finds a live invitation by its secret token.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<InvitationEntity>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {INVITATION_COLUMNS}
            FROM invitations
            WHERE token = $1 AND is_deleted = FALSE
            "#
        );
        sqlx::query_as::<_, InvitationEntity>(&query)
            .bind(token)
            .fetch_optional(&self.pool)
            .await
    }

    /// Checks whether an unexpired pending invitation already exists for the
    /// email in this group.
    pub async fn has_pending_for_email(
        &self,
        group_id: Uuid,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM invitations
                WHERE group_id = $1
                  AND LOWER(invited_email) = LOWER($2)
                  AND status = 'pending'
                  AND expires_at >= $3
                  AND is_deleted = FALSE
            )
            "#,
        )
        .bind(group_id)
        .bind(email)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Lists a group's live invitations, optionally filtered by status,
    /// newest first.
    pub async fn list_by_group(
        &self,
        group_id: Uuid,
        status: Option<InvitationStatusDb>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<InvitationEntity>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {INVITATION_COLUMNS}
            FROM invitations
            WHERE group_id = $1
              AND ($2::invitation_status IS NULL OR status = $2)
              AND is_deleted = FALSE
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        );
        sqlx::query_as::<_, InvitationEntity>(&query)
            .bind(group_id)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
    }

    /// Counts a group's live invitations per status.
    pub async fn summary(&self, group_id: Uuid) -> Result<InvitationSummary, sqlx::Error> {
        let rows: Vec<(InvitationStatusDb, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*)
            FROM invitations
            WHERE group_id = $1 AND is_deleted = FALSE
            GROUP BY status
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        let mut summary = InvitationSummary::default();
        for (status, count) in rows {
            match status {
                InvitationStatusDb::Pending => summary.pending = count,
                InvitationStatusDb::Accepted => summary.accepted = count,
                InvitationStatusDb::Declined => summary.declined = count,
                InvitationStatusDb::Expired => summary.expired = count,
                InvitationStatusDb::Revoked => summary.revoked = count,
            }
        }
        Ok(summary)
    }

    /// Applies a terminal status to a pending invitation.
    ///
    /// The `status = 'pending'` guard makes the transition race-safe: the
    /// first caller wins, later callers get the recorded status back.
    pub async fn resolve(
        &self,
        id: Uuid,
        status: InvitationStatusDb,
        acting_user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<ResolveOutcome, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE invitations
            SET status = $2, responded_at = $3, updated_at = $3, updated_by = $4
            WHERE id = $1 AND status = 'pending' AND is_deleted = FALSE
            RETURNING {INVITATION_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, InvitationEntity>(&query)
            .bind(id)
            .bind(status)
            .bind(now)
            .bind(acting_user_id)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(invitation) = updated {
            return Ok(ResolveOutcome::Resolved(invitation));
        }

        let current: Option<(InvitationStatusDb,)> = sqlx::query_as(
            r#"
            SELECT status FROM invitations
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(match current {
            Some((status,)) => ResolveOutcome::NotPending(status),
            None => ResolveOutcome::NotFound,
        })
    }

    /// Accepts an invitation by token and adds the user to the group.
    ///
    /// The invitation row is locked, expiry is evaluated lazily, then the
    /// membership is created under the group's capacity lock. Nothing is
    /// consumed unless the membership insert succeeds.
    pub async fn accept(
        &self,
        token: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<AcceptOutcome, sqlx::Error> {
        let timer = QueryTimer::new("accept_invitation");
        let mut tx = self.pool.begin().await?;

        let lock_query = format!(
            r#"
            SELECT {INVITATION_COLUMNS}
            FROM invitations
            WHERE token = $1 AND is_deleted = FALSE
            FOR UPDATE
            "#
        );
        let invitation = sqlx::query_as::<_, InvitationEntity>(&lock_query)
            .bind(token)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(invitation) = invitation else {
            return Ok(AcceptOutcome::NotFound);
        };

        if invitation.status != InvitationStatusDb::Pending {
            return Ok(AcceptOutcome::AlreadyResolved(invitation.status));
        }
        if now > invitation.expires_at {
            sqlx::query(
                r#"
                UPDATE invitations
                SET status = 'expired', updated_at = $2
                WHERE id = $1
                "#,
            )
            .bind(invitation.id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            return Ok(AcceptOutcome::Lapsed);
        }

        let group: Option<(i32,)> = sqlx::query_as(
            r#"
            SELECT max_members FROM groups
            WHERE id = $1 AND is_deleted = FALSE
            FOR UPDATE
            "#,
        )
        .bind(invitation.group_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((max_members,)) = group else {
            return Ok(AcceptOutcome::GroupGone);
        };

        let (active_count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM group_members
            WHERE group_id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(invitation.group_id)
        .fetch_one(&mut *tx)
        .await?;
        if active_count >= max_members as i64 {
            return Ok(AcceptOutcome::CapacityReached { max_members });
        }

        let member_query = format!(
            r#"
            INSERT INTO group_members (group_id, user_id, role, joined_at, invited_by,
                                       created_at, created_by, updated_at, updated_by)
            VALUES ($1, $2, 'member', $3, $4, $3, $2, $3, $2)
            RETURNING {MEMBER_COLUMNS}
            "#
        );
        let inserted = sqlx::query_as::<_, GroupMemberEntity>(&member_query)
            .bind(invitation.group_id)
            .bind(user_id)
            .bind(now)
            .bind(invitation.invited_by)
            .fetch_one(&mut *tx)
            .await;
        let member = match inserted {
            Ok(member) => member,
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                return Ok(AcceptOutcome::AlreadyMember);
            }
            Err(err) => return Err(err),
        };

        let accept_query = format!(
            r#"
            UPDATE invitations
            SET status = 'accepted', invited_user_id = $2, responded_at = $3,
                updated_at = $3, updated_by = $2
            WHERE id = $1
            RETURNING {INVITATION_COLUMNS}
            "#
        );
        let invitation = sqlx::query_as::<_, InvitationEntity>(&accept_query)
            .bind(invitation.id)
            .bind(user_id)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        timer.record();
        Ok(AcceptOutcome::Accepted { invitation, member })
    }
}
