//! Repository for group database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{GroupEntity, GroupMemberEntity, GroupRoleDb};
use crate::metrics::QueryTimer;

const GROUP_COLUMNS: &str = "id, name, description, owner_id, invite_code, invite_code_expires, \
     allow_members_to_invite, max_members, \
     created_at, created_by, updated_at, updated_by, is_deleted, deleted_at, deleted_by";

const MEMBER_COLUMNS: &str = "id, group_id, user_id, role, joined_at, invited_by, last_activity_at, \
     created_at, created_by, updated_at, updated_by, is_deleted, deleted_at, deleted_by";

/// Repository for group operations.
#[derive(Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    /// Creates a new group repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a group and its Owner membership in one transaction.
    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        owner_id: Uuid,
        max_members: i32,
        invite_code: &str,
        now: DateTime<Utc>,
    ) -> Result<(GroupEntity, GroupMemberEntity), sqlx::Error> {
        let timer = QueryTimer::new("create_group");
        let mut tx = self.pool.begin().await?;

        let group_query = format!(
            r#"
            INSERT INTO groups (name, description, owner_id, max_members, invite_code,
                                created_at, created_by, updated_at, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $3, $6, $3)
            RETURNING {GROUP_COLUMNS}
            "#
        );
        let group = sqlx::query_as::<_, GroupEntity>(&group_query)
            .bind(name)
            .bind(description)
            .bind(owner_id)
            .bind(max_members)
            .bind(invite_code)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        let member_query = format!(
            r#"
            INSERT INTO group_members (group_id, user_id, role, joined_at,
                                       created_at, created_by, updated_at, updated_by)
            VALUES ($1, $2, 'owner', $3, $3, $2, $3, $2)
            RETURNING {MEMBER_COLUMNS}
            "#
        );
        let owner = sqlx::query_as::<_, GroupMemberEntity>(&member_query)
            .bind(group.id)
            .bind(owner_id)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        timer.record();
        Ok((group, owner))
    }

    /// Finds a live group by id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<GroupEntity>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {GROUP_COLUMNS}
            FROM groups
            WHERE id = $1 AND is_deleted = FALSE
            "#
        );
        sqlx::query_as::<_, GroupEntity>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Finds a group by id including tombstoned rows (audit use only).
    pub async fn find_by_id_any(&self, id: Uuid) -> Result<Option<GroupEntity>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {GROUP_COLUMNS}
            FROM groups
            WHERE id = $1
            "#
        );
        sqlx::query_as::<_, GroupEntity>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Finds a live group by its shareable invite code.
    pub async fn find_by_invite_code(
        &self,
        invite_code: &str,
    ) -> Result<Option<GroupEntity>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {GROUP_COLUMNS}
            FROM groups
            WHERE invite_code = $1 AND is_deleted = FALSE
            "#
        );
        sqlx::query_as::<_, GroupEntity>(&query)
            .bind(invite_code)
            .fetch_optional(&self.pool)
            .await
    }

    /// Lists live groups the user is an active member of.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<GroupEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_groups_for_user");
        let query = format!(
            r#"
            SELECT {}
            FROM groups g
            JOIN group_members gm ON gm.group_id = g.id
            WHERE gm.user_id = $1
              AND gm.is_deleted = FALSE
              AND g.is_deleted = FALSE
            ORDER BY gm.joined_at DESC
            "#,
            GROUP_COLUMNS
                .split(", ")
                .map(|c| format!("g.{c}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let result = sqlx::query_as::<_, GroupEntity>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Updates group settings.
    ///
    /// `max_members` is never lowered below the current active member count;
    /// the row is locked so the count cannot change underneath the check.
    /// Returns `None` when the group does not exist, `Some(Err(count))` when
    /// the new cap is below the active member count.
    pub async fn update_settings(
        &self,
        group_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        allow_members_to_invite: Option<bool>,
        max_members: Option<i32>,
        acting_user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Option<Result<GroupEntity, i64>>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let lock_query = format!(
            r#"
            SELECT {GROUP_COLUMNS}
            FROM groups
            WHERE id = $1 AND is_deleted = FALSE
            FOR UPDATE
            "#
        );
        let existing = sqlx::query_as::<_, GroupEntity>(&lock_query)
            .bind(group_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(_) = existing else {
            return Ok(None);
        };

        if let Some(cap) = max_members {
            let (active_count,): (i64,) = sqlx::query_as(
                r#"
                SELECT COUNT(*) FROM group_members
                WHERE group_id = $1 AND is_deleted = FALSE
                "#,
            )
            .bind(group_id)
            .fetch_one(&mut *tx)
            .await?;
            if (cap as i64) < active_count {
                return Ok(Some(Err(active_count)));
            }
        }

        let update_query = format!(
            r#"
            UPDATE groups
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                allow_members_to_invite = COALESCE($4, allow_members_to_invite),
                max_members = COALESCE($5, max_members),
                updated_at = $6,
                updated_by = $7
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING {GROUP_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, GroupEntity>(&update_query)
            .bind(group_id)
            .bind(name)
            .bind(description)
            .bind(allow_members_to_invite)
            .bind(max_members)
            .bind(now)
            .bind(acting_user_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(Ok(updated)))
    }

    /// Replaces the group's shareable invite code.
    pub async fn rotate_invite_code(
        &self,
        group_id: Uuid,
        invite_code: &str,
        invite_code_expires: Option<DateTime<Utc>>,
        acting_user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Option<GroupEntity>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE groups
            SET invite_code = $2,
                invite_code_expires = $3,
                updated_at = $4,
                updated_by = $5
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING {GROUP_COLUMNS}
            "#
        );
        sqlx::query_as::<_, GroupEntity>(&query)
            .bind(group_id)
            .bind(invite_code)
            .bind(invite_code_expires)
            .bind(now)
            .bind(acting_user_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Transfers the Owner role to another active member.
    ///
    /// Swaps the two membership roles and updates `groups.owner_id` in one
    /// transaction. Returns `false` if the group or target membership is
    /// missing.
    pub async fn transfer_ownership(
        &self,
        group_id: Uuid,
        current_owner_id: Uuid,
        new_owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let promoted = sqlx::query(
            r#"
            UPDATE group_members
            SET role = 'owner', updated_at = $3, updated_by = $4
            WHERE group_id = $1 AND user_id = $2 AND is_deleted = FALSE
            "#,
        )
        .bind(group_id)
        .bind(new_owner_id)
        .bind(now)
        .bind(current_owner_id)
        .execute(&mut *tx)
        .await?;
        if promoted.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE group_members
            SET role = $5, updated_at = $3, updated_by = $4
            WHERE group_id = $1 AND user_id = $2 AND is_deleted = FALSE
            "#,
        )
        .bind(group_id)
        .bind(current_owner_id)
        .bind(now)
        .bind(current_owner_id)
        .bind(GroupRoleDb::Admin)
        .execute(&mut *tx)
        .await?;

        let group = sqlx::query(
            r#"
            UPDATE groups
            SET owner_id = $2, updated_at = $3, updated_by = $4
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(group_id)
        .bind(new_owner_id)
        .bind(now)
        .bind(current_owner_id)
        .execute(&mut *tx)
        .await?;
        if group.rows_affected() == 0 {
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Tombstones a group and all of its children in one transaction.
    ///
    /// Members, lists, items, and invitations are cascaded so that a
    /// partially tombstoned group is never visible.
    pub async fn soft_delete_cascade(
        &self,
        group_id: Uuid,
        acting_user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("soft_delete_group_cascade");
        let mut tx = self.pool.begin().await?;

        let group = sqlx::query(
            r#"
            UPDATE groups
            SET is_deleted = TRUE, deleted_at = $2, deleted_by = $3,
                updated_at = $2, updated_by = $3
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(group_id)
        .bind(now)
        .bind(acting_user_id)
        .execute(&mut *tx)
        .await?;
        if group.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE group_members
            SET is_deleted = TRUE, deleted_at = $2, deleted_by = $3,
                updated_at = $2, updated_by = $3
            WHERE group_id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(group_id)
        .bind(now)
        .bind(acting_user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE shopping_items
            SET is_deleted = TRUE, deleted_at = $2, deleted_by = $3,
                updated_at = $2, updated_by = $3
            WHERE is_deleted = FALSE
              AND list_id IN (SELECT id FROM shopping_lists WHERE group_id = $1)
            "#,
        )
        .bind(group_id)
        .bind(now)
        .bind(acting_user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE shopping_lists
            SET is_deleted = TRUE, deleted_at = $2, deleted_by = $3,
                updated_at = $2, updated_by = $3
            WHERE group_id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(group_id)
        .bind(now)
        .bind(acting_user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE invitations
            SET is_deleted = TRUE, deleted_at = $2, deleted_by = $3,
                updated_at = $2, updated_by = $3
            WHERE group_id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(group_id)
        .bind(now)
        .bind(acting_user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        tracing::info!(%group_id, "group tombstoned with cascade");
        Ok(true)
    }
}
