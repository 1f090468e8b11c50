//! Repository for purchase history database operations.

use chrono::{DateTime, Utc};
use domain::models::{day_gap, next_average_days};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::PurchaseHistoryEntity;
use crate::metrics::QueryTimer;

const HISTORY_COLUMNS: &str = "id, user_id, group_id, item_name, category, purchase_count, \
     first_purchased_at, last_purchased_at, average_days_between_purchases, \
     created_at, created_by, updated_at, updated_by, is_deleted, deleted_at, deleted_by";

/// Repository for purchase history aggregation.
#[derive(Clone)]
pub struct PurchaseHistoryRepository {
    pool: PgPool,
}

impl PurchaseHistoryRepository {
    /// Creates a new purchase history repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Folds one purchase event into the (user, group, item_name) aggregate.
    ///
    /// `item_name` must already be normalized. The existing row is locked so
    /// concurrent purchases of the same item serialize; the running average
    /// is recomputed from the stored state and the new gap. Out-of-order
    /// events never move `last_purchased_at` backwards; their gap counts as
    /// zero days.
    pub async fn record_purchase(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        item_name: &str,
        category: Option<&str>,
        purchased_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<PurchaseHistoryEntity, sqlx::Error> {
        let timer = QueryTimer::new("record_purchase");
        let mut tx = self.pool.begin().await?;

        let lock_query = format!(
            r#"
            SELECT {HISTORY_COLUMNS}
            FROM purchase_history
            WHERE user_id = $1 AND group_id = $2 AND item_name = $3
              AND is_deleted = FALSE
            FOR UPDATE
            "#
        );
        let existing = sqlx::query_as::<_, PurchaseHistoryEntity>(&lock_query)
            .bind(user_id)
            .bind(group_id)
            .bind(item_name)
            .fetch_optional(&mut *tx)
            .await?;

        let entity = match existing {
            None => {
                let insert_query = format!(
                    r#"
                    INSERT INTO purchase_history (user_id, group_id, item_name, category,
                                                  purchase_count, first_purchased_at,
                                                  last_purchased_at,
                                                  created_at, created_by, updated_at, updated_by)
                    VALUES ($1, $2, $3, $4, 1, $5, $5, $6, $1, $6, $1)
                    RETURNING {HISTORY_COLUMNS}
                    "#
                );
                sqlx::query_as::<_, PurchaseHistoryEntity>(&insert_query)
                    .bind(user_id)
                    .bind(group_id)
                    .bind(item_name)
                    .bind(category)
                    .bind(purchased_at)
                    .bind(now)
                    .fetch_one(&mut *tx)
                    .await?
            }
            Some(row) => {
                let purchase_count = row.purchase_count + 1;
                let gap = day_gap(row.last_purchased_at, purchased_at);
                let average = next_average_days(
                    purchase_count,
                    row.average_days_between_purchases,
                    gap,
                );
                let last_purchased_at = row.last_purchased_at.max(purchased_at);

                let update_query = format!(
                    r#"
                    UPDATE purchase_history
                    SET purchase_count = $2,
                        last_purchased_at = $3,
                        average_days_between_purchases = $4,
                        category = COALESCE($5, category),
                        updated_at = $6,
                        updated_by = user_id
                    WHERE id = $1
                    RETURNING {HISTORY_COLUMNS}
                    "#
                );
                sqlx::query_as::<_, PurchaseHistoryEntity>(&update_query)
                    .bind(row.id)
                    .bind(purchase_count)
                    .bind(last_purchased_at)
                    .bind(average)
                    .bind(category)
                    .bind(now)
                    .fetch_one(&mut *tx)
                    .await?
            }
        };

        tx.commit().await?;
        timer.record();
        Ok(entity)
    }

    /// Finds the aggregate for one normalized item name.
    pub async fn find_by_key(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        item_name: &str,
    ) -> Result<Option<PurchaseHistoryEntity>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {HISTORY_COLUMNS}
            FROM purchase_history
            WHERE user_id = $1 AND group_id = $2 AND item_name = $3
              AND is_deleted = FALSE
            "#
        );
        sqlx::query_as::<_, PurchaseHistoryEntity>(&query)
            .bind(user_id)
            .bind(group_id)
            .bind(item_name)
            .fetch_optional(&self.pool)
            .await
    }

    /// Lists a user's aggregates in a group, most frequently bought first.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PurchaseHistoryEntity>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {HISTORY_COLUMNS}
            FROM purchase_history
            WHERE user_id = $1 AND group_id = $2 AND is_deleted = FALSE
            ORDER BY purchase_count DESC, last_purchased_at DESC
            LIMIT $3 OFFSET $4
            "#
        );
        sqlx::query_as::<_, PurchaseHistoryEntity>(&query)
            .bind(user_id)
            .bind(group_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
    }

    /// Lists aggregates with a known cadence whose projected next purchase is
    /// at or before `due_by`, most overdue first.
    ///
    /// Only items seen at least twice carry a cadence, so single purchases
    /// never produce suggestions.
    pub async fn due_suggestions(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        due_by: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PurchaseHistoryEntity>, sqlx::Error> {
        let timer = QueryTimer::new("purchase_suggestions");
        let query = format!(
            r#"
            SELECT {HISTORY_COLUMNS}
            FROM purchase_history
            WHERE user_id = $1 AND group_id = $2
              AND is_deleted = FALSE
              AND average_days_between_purchases IS NOT NULL
              AND last_purchased_at
                  + make_interval(days => average_days_between_purchases) <= $3
            ORDER BY last_purchased_at
                  + make_interval(days => average_days_between_purchases) ASC
            LIMIT $4
            "#
        );
        let result = sqlx::query_as::<_, PurchaseHistoryEntity>(&query)
            .bind(user_id)
            .bind(group_id)
            .bind(due_by)
            .bind(limit)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Tombstones an aggregate row.
    pub async fn soft_delete(
        &self,
        id: Uuid,
        acting_user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE purchase_history
            SET is_deleted = TRUE, deleted_at = $2, deleted_by = $3,
                updated_at = $2, updated_by = $3
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(acting_user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
