//! Repository for shopping list database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::ShoppingListEntity;
use crate::metrics::QueryTimer;

const LIST_COLUMNS: &str = "id, group_id, name, description, created_by_user_id, \
     is_archived, archived_at, color, icon, \
     created_at, created_by, updated_at, updated_by, is_deleted, deleted_at, deleted_by";

/// Repository for shopping list operations.
#[derive(Clone)]
pub struct ShoppingListRepository {
    pool: PgPool,
}

impl ShoppingListRepository {
    /// Creates a new shopping list repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a list in a group.
    pub async fn create(
        &self,
        group_id: Uuid,
        name: &str,
        description: Option<&str>,
        created_by_user_id: Uuid,
        color: Option<&str>,
        icon: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ShoppingListEntity, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO shopping_lists (group_id, name, description, created_by_user_id,
                                        color, icon,
                                        created_at, created_by, updated_at, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $4, $7, $4)
            RETURNING {LIST_COLUMNS}
            "#
        );
        sqlx::query_as::<_, ShoppingListEntity>(&query)
            .bind(group_id)
            .bind(name)
            .bind(description)
            .bind(created_by_user_id)
            .bind(color)
            .bind(icon)
            .bind(now)
            .fetch_one(&self.pool)
            .await
    }

    /// Finds a live list by id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ShoppingListEntity>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {LIST_COLUMNS}
            FROM shopping_lists
            WHERE id = $1 AND is_deleted = FALSE
            "#
        );
        sqlx::query_as::<_, ShoppingListEntity>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Finds a list by id including tombstoned rows (audit use only).
    pub async fn find_by_id_any(
        &self,
        id: Uuid,
    ) -> Result<Option<ShoppingListEntity>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {LIST_COLUMNS}
            FROM shopping_lists
            WHERE id = $1
            "#
        );
        sqlx::query_as::<_, ShoppingListEntity>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Lists a group's live lists, active before archived, newest first.
    pub async fn list_by_group(
        &self,
        group_id: Uuid,
        include_archived: bool,
    ) -> Result<Vec<ShoppingListEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_shopping_lists");
        let query = format!(
            r#"
            SELECT {LIST_COLUMNS}
            FROM shopping_lists
            WHERE group_id = $1
              AND is_deleted = FALSE
              AND ($2 OR is_archived = FALSE)
            ORDER BY is_archived ASC, created_at DESC
            "#
        );
        let result = sqlx::query_as::<_, ShoppingListEntity>(&query)
            .bind(group_id)
            .bind(include_archived)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Updates list metadata.
    pub async fn update(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        color: Option<&str>,
        icon: Option<&str>,
        acting_user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Option<ShoppingListEntity>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE shopping_lists
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                color = COALESCE($4, color),
                icon = COALESCE($5, icon),
                updated_at = $6,
                updated_by = $7
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING {LIST_COLUMNS}
            "#
        );
        sqlx::query_as::<_, ShoppingListEntity>(&query)
            .bind(id)
            .bind(name)
            .bind(description)
            .bind(color)
            .bind(icon)
            .bind(now)
            .bind(acting_user_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Sets or clears the archived flag.
    pub async fn set_archived(
        &self,
        id: Uuid,
        archived: bool,
        acting_user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Option<ShoppingListEntity>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE shopping_lists
            SET is_archived = $2,
                archived_at = CASE WHEN $2 THEN $3 ELSE NULL END,
                updated_at = $3,
                updated_by = $4
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING {LIST_COLUMNS}
            "#
        );
        sqlx::query_as::<_, ShoppingListEntity>(&query)
            .bind(id)
            .bind(archived)
            .bind(now)
            .bind(acting_user_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Tombstones a list and its items in one transaction.
    pub async fn soft_delete_cascade(
        &self,
        id: Uuid,
        acting_user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let list = sqlx::query(
            r#"
            UPDATE shopping_lists
            SET is_deleted = TRUE, deleted_at = $2, deleted_by = $3,
                updated_at = $2, updated_by = $3
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(acting_user_id)
        .execute(&mut *tx)
        .await?;
        if list.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE shopping_items
            SET is_deleted = TRUE, deleted_at = $2, deleted_by = $3,
                updated_at = $2, updated_by = $3
            WHERE list_id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(acting_user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
