//! Repository for group membership database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{GroupMemberEntity, GroupRoleDb};
use crate::metrics::QueryTimer;

const MEMBER_COLUMNS: &str = "id, group_id, user_id, role, joined_at, invited_by, last_activity_at, \
     created_at, created_by, updated_at, updated_by, is_deleted, deleted_at, deleted_by";

/// Result of attempting to add a member to a group.
#[derive(Debug)]
pub enum AddMemberOutcome {
    /// The membership row was created.
    Added(GroupMemberEntity),
    /// An active membership for this (group, user) pair already exists.
    AlreadyMember,
    /// The group is at its `max_members` cap.
    CapacityReached { max_members: i32 },
    /// The group does not exist or is tombstoned.
    GroupNotFound,
}

/// Repository for group membership operations.
#[derive(Clone)]
pub struct GroupMemberRepository {
    pool: PgPool,
}

impl GroupMemberRepository {
    /// Creates a new group member repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds the active membership for a (group, user) pair.
    pub async fn find_active(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<GroupMemberEntity>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {MEMBER_COLUMNS}
            FROM group_members
            WHERE group_id = $1 AND user_id = $2 AND is_deleted = FALSE
            "#
        );
        sqlx::query_as::<_, GroupMemberEntity>(&query)
            .bind(group_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Counts active members of a group.
    pub async fn count_active(&self, group_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM group_members
            WHERE group_id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(group_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Lists active members of a group, owner first, then by join date.
    pub async fn list_active(&self, group_id: Uuid) -> Result<Vec<GroupMemberEntity>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {MEMBER_COLUMNS}
            FROM group_members
            WHERE group_id = $1 AND is_deleted = FALSE
            ORDER BY (role = 'owner') DESC, joined_at ASC
            "#
        );
        sqlx::query_as::<_, GroupMemberEntity>(&query)
            .bind(group_id)
            .fetch_all(&self.pool)
            .await
    }

    /// Adds a member to a group, enforcing the capacity cap.
    ///
    /// The group row is locked for the duration of the transaction so the
    /// capacity check and the insert are atomic. A concurrent duplicate that
    /// slips past the pre-check is caught by the partial unique index on the
    /// active (group_id, user_id) pair.
    pub async fn add_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: GroupRoleDb,
        invited_by: Option<Uuid>,
        acting_user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<AddMemberOutcome, sqlx::Error> {
        let timer = QueryTimer::new("add_group_member");
        let mut tx = self.pool.begin().await?;

        let group: Option<(i32,)> = sqlx::query_as(
            r#"
            SELECT max_members FROM groups
            WHERE id = $1 AND is_deleted = FALSE
            FOR UPDATE
            "#,
        )
        .bind(group_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((max_members,)) = group else {
            return Ok(AddMemberOutcome::GroupNotFound);
        };

        let (active_count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM group_members
            WHERE group_id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(group_id)
        .fetch_one(&mut *tx)
        .await?;
        if active_count >= max_members as i64 {
            return Ok(AddMemberOutcome::CapacityReached { max_members });
        }

        let insert_query = format!(
            r#"
            INSERT INTO group_members (group_id, user_id, role, joined_at, invited_by,
                                       created_at, created_by, updated_at, updated_by)
            VALUES ($1, $2, $3, $4, $5, $4, $6, $4, $6)
            RETURNING {MEMBER_COLUMNS}
            "#
        );
        let inserted = sqlx::query_as::<_, GroupMemberEntity>(&insert_query)
            .bind(group_id)
            .bind(user_id)
            .bind(role)
            .bind(now)
            .bind(invited_by)
            .bind(acting_user_id)
            .fetch_one(&mut *tx)
            .await;

        let member = match inserted {
            Ok(member) => member,
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                return Ok(AddMemberOutcome::AlreadyMember);
            }
            Err(err) => return Err(err),
        };

        tx.commit().await?;
        timer.record();
        Ok(AddMemberOutcome::Added(member))
    }

    /// Changes an active member's role.
    pub async fn set_role(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: GroupRoleDb,
        acting_user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Option<GroupMemberEntity>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE group_members
            SET role = $3, updated_at = $4, updated_by = $5
            WHERE group_id = $1 AND user_id = $2 AND is_deleted = FALSE
            RETURNING {MEMBER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, GroupMemberEntity>(&query)
            .bind(group_id)
            .bind(user_id)
            .bind(role)
            .bind(now)
            .bind(acting_user_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Tombstones a membership. The owner row is never removed this way;
    /// ownership must be transferred or the group deleted instead.
    pub async fn remove(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        acting_user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE group_members
            SET is_deleted = TRUE, deleted_at = $3, deleted_by = $4,
                updated_at = $3, updated_by = $4
            WHERE group_id = $1 AND user_id = $2
              AND role <> 'owner' AND is_deleted = FALSE
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(now)
        .bind(acting_user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Stamps the member's last activity timestamp.
    pub async fn touch_activity(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE group_members
            SET last_activity_at = $3
            WHERE group_id = $1 AND user_id = $2 AND is_deleted = FALSE
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
