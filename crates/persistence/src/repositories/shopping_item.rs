//! Repository for shopping item database operations.
//!
//! Item writes are version guarded: an update only lands when the caller's
//! expected version matches the stored one, and every successful write bumps
//! the version by one.

use chrono::{DateTime, Utc};
use domain::models::{plan_reorder, ReorderOutcome};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::ShoppingItemEntity;
use crate::metrics::QueryTimer;

const ITEM_COLUMNS: &str = "id, list_id, name, quantity, notes, category, is_urgent, \
     is_purchased, purchased_at, purchased_by, purchased_quantity, \
     added_by_user_id, version, is_synced, display_order, \
     created_at, created_by, updated_at, updated_by, is_deleted, deleted_at, deleted_by";

/// Result of a version-guarded item write.
#[derive(Debug)]
pub enum CasOutcome {
    /// The write landed; carries the new row.
    Updated(ShoppingItemEntity),
    /// The stored version differs from the expected one; carries the current
    /// row so the caller can rebase.
    Conflict(ShoppingItemEntity),
    /// No live item with that id exists.
    NotFound,
}

/// Repository for shopping item operations.
#[derive(Clone)]
pub struct ShoppingItemRepository {
    pool: PgPool,
}

impl ShoppingItemRepository {
    /// Creates a new shopping item repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Adds an item to the end of a list.
    pub async fn add(
        &self,
        list_id: Uuid,
        name: &str,
        quantity: i32,
        notes: Option<&str>,
        category: Option<&str>,
        is_urgent: bool,
        added_by_user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ShoppingItemEntity, sqlx::Error> {
        let timer = QueryTimer::new("add_shopping_item");
        let query = format!(
            r#"
            INSERT INTO shopping_items (list_id, name, quantity, notes, category, is_urgent,
                                        added_by_user_id, display_order,
                                        created_at, created_by, updated_at, updated_by)
            SELECT $1, $2, $3, $4, $5, $6, $7,
                   COALESCE(MAX(display_order) + 1, 0), $8, $7, $8, $7
            FROM shopping_items
            WHERE list_id = $1 AND is_deleted = FALSE
            RETURNING {ITEM_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, ShoppingItemEntity>(&query)
            .bind(list_id)
            .bind(name)
            .bind(quantity)
            .bind(notes)
            .bind(category)
            .bind(is_urgent)
            .bind(added_by_user_id)
            .bind(now)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Finds a live item by id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ShoppingItemEntity>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM shopping_items
            WHERE id = $1 AND is_deleted = FALSE
            "#
        );
        sqlx::query_as::<_, ShoppingItemEntity>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Lists a list's live items in display order.
    pub async fn list_by_list(
        &self,
        list_id: Uuid,
    ) -> Result<Vec<ShoppingItemEntity>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM shopping_items
            WHERE list_id = $1 AND is_deleted = FALSE
            ORDER BY display_order ASC, created_at ASC
            "#
        );
        sqlx::query_as::<_, ShoppingItemEntity>(&query)
            .bind(list_id)
            .fetch_all(&self.pool)
            .await
    }

    /// Applies a field patch if the expected version still matches.
    pub async fn update_fields(
        &self,
        id: Uuid,
        expected_version: i32,
        name: Option<&str>,
        quantity: Option<i32>,
        notes: Option<&str>,
        category: Option<&str>,
        is_urgent: Option<bool>,
        acting_user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<CasOutcome, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE shopping_items
            SET name = COALESCE($3, name),
                quantity = COALESCE($4, quantity),
                notes = COALESCE($5, notes),
                category = COALESCE($6, category),
                is_urgent = COALESCE($7, is_urgent),
                version = version + 1,
                is_synced = TRUE,
                updated_at = $8,
                updated_by = $9
            WHERE id = $1 AND version = $2 AND is_deleted = FALSE
            RETURNING {ITEM_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, ShoppingItemEntity>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(name)
            .bind(quantity)
            .bind(notes)
            .bind(category)
            .bind(is_urgent)
            .bind(now)
            .bind(acting_user_id)
            .fetch_optional(&self.pool)
            .await?;
        self.cas_result(id, updated).await
    }

    /// Marks the item purchased if the expected version still matches.
    pub async fn mark_purchased(
        &self,
        id: Uuid,
        expected_version: i32,
        purchased_by: Uuid,
        purchased_quantity: Option<i32>,
        now: DateTime<Utc>,
    ) -> Result<CasOutcome, sqlx::Error> {
        let timer = QueryTimer::new("mark_item_purchased");
        let query = format!(
            r#"
            UPDATE shopping_items
            SET is_purchased = TRUE,
                purchased_at = $5,
                purchased_by = $3,
                purchased_quantity = COALESCE($4, quantity),
                version = version + 1,
                is_synced = TRUE,
                updated_at = $5,
                updated_by = $3
            WHERE id = $1 AND version = $2 AND is_deleted = FALSE
            RETURNING {ITEM_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, ShoppingItemEntity>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(purchased_by)
            .bind(purchased_quantity)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        timer.record();
        self.cas_result(id, updated).await
    }

    /// Clears the purchased state if the expected version still matches.
    pub async fn unmark_purchased(
        &self,
        id: Uuid,
        expected_version: i32,
        acting_user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<CasOutcome, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE shopping_items
            SET is_purchased = FALSE,
                purchased_at = NULL,
                purchased_by = NULL,
                purchased_quantity = NULL,
                version = version + 1,
                is_synced = TRUE,
                updated_at = $3,
                updated_by = $4
            WHERE id = $1 AND version = $2 AND is_deleted = FALSE
            RETURNING {ITEM_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, ShoppingItemEntity>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(now)
            .bind(acting_user_id)
            .fetch_optional(&self.pool)
            .await?;
        self.cas_result(id, updated).await
    }

    /// Tombstones the item if the expected version still matches.
    pub async fn soft_delete(
        &self,
        id: Uuid,
        expected_version: i32,
        acting_user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<CasOutcome, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE shopping_items
            SET is_deleted = TRUE,
                deleted_at = $3,
                deleted_by = $4,
                version = version + 1,
                updated_at = $3,
                updated_by = $4
            WHERE id = $1 AND version = $2 AND is_deleted = FALSE
            RETURNING {ITEM_COLUMNS}
            "#
        );
        let deleted = sqlx::query_as::<_, ShoppingItemEntity>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(now)
            .bind(acting_user_id)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(item) = deleted {
            return Ok(CasOutcome::Updated(item));
        }
        self.cas_result(id, None).await
    }

    /// Rewrites a list's display order from the requested id sequence.
    ///
    /// Items are locked for the whole transaction so concurrent adds cannot
    /// interleave. Unknown ids are skipped and reported, known items missing
    /// from the request keep their relative order at the tail.
    pub async fn reorder(
        &self,
        list_id: Uuid,
        requested: &[Uuid],
        acting_user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<ReorderOutcome, sqlx::Error> {
        let timer = QueryTimer::new("reorder_shopping_items");
        let mut tx = self.pool.begin().await?;

        let current: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id FROM shopping_items
            WHERE list_id = $1 AND is_deleted = FALSE
            ORDER BY display_order ASC, created_at ASC
            FOR UPDATE
            "#,
        )
        .bind(list_id)
        .fetch_all(&mut *tx)
        .await?;
        let current: Vec<Uuid> = current.into_iter().map(|(id,)| id).collect();

        let order = plan_reorder(&current, requested);
        let failed_ids: Vec<Uuid> = requested
            .iter()
            .filter(|id| !current.contains(id))
            .copied()
            .collect();

        for (position, item_id) in order.iter().enumerate() {
            sqlx::query(
                r#"
                UPDATE shopping_items
                SET display_order = $2, updated_at = $3, updated_by = $4
                WHERE id = $1
                "#,
            )
            .bind(item_id)
            .bind(position as i32)
            .bind(now)
            .bind(acting_user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        timer.record();
        if !failed_ids.is_empty() {
            tracing::warn!(%list_id, failed = failed_ids.len(), "reorder skipped missing items");
        }
        Ok(ReorderOutcome {
            reordered: order.len(),
            failed_ids,
        })
    }

    /// Distinguishes a version conflict from a missing row after a guarded
    /// update matched nothing.
    async fn cas_result(
        &self,
        id: Uuid,
        updated: Option<ShoppingItemEntity>,
    ) -> Result<CasOutcome, sqlx::Error> {
        if let Some(item) = updated {
            return Ok(CasOutcome::Updated(item));
        }
        match self.find_by_id(id).await? {
            Some(current) => Ok(CasOutcome::Conflict(current)),
            None => Ok(CasOutcome::NotFound),
        }
    }
}
