//! Purchase history entity (database row mapping).

use chrono::{DateTime, Duration, Utc};
use domain::models::{AuditInfo, PurchaseHistory, PurchaseSuggestion, Tombstone};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the purchase_history table.
///
/// `item_name` is stored normalized (trimmed, lowercased); the unique key
/// for live rows is (user_id, group_id, item_name).
#[derive(Debug, Clone, FromRow)]
pub struct PurchaseHistoryEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub item_name: String,
    pub category: Option<String>,
    pub purchase_count: i32,
    pub first_purchased_at: Option<DateTime<Utc>>,
    pub last_purchased_at: DateTime<Utc>,
    pub average_days_between_purchases: Option<i32>,
    #[sqlx(flatten)]
    pub audit: AuditInfo,
    #[sqlx(flatten)]
    pub tombstone: Tombstone,
}

impl PurchaseHistoryEntity {
    /// Projected date of the next purchase, when a cadence is known.
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.average_days_between_purchases
            .map(|days| self.last_purchased_at + Duration::days(days as i64))
    }

    /// Builds the suggestion view of this row.
    pub fn to_suggestion(&self) -> PurchaseSuggestion {
        PurchaseSuggestion {
            item_name: self.item_name.clone(),
            purchase_count: self.purchase_count,
            last_purchased_at: self.last_purchased_at,
            average_days_between_purchases: self.average_days_between_purchases,
            due_at: self.due_at(),
        }
    }
}

impl From<PurchaseHistoryEntity> for PurchaseHistory {
    fn from(entity: PurchaseHistoryEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            group_id: entity.group_id,
            item_name: entity.item_name,
            category: entity.category,
            purchase_count: entity.purchase_count,
            first_purchased_at: entity.first_purchased_at,
            last_purchased_at: entity.last_purchased_at,
            average_days_between_purchases: entity.average_days_between_purchases,
            audit: entity.audit,
            tombstone: entity.tombstone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(avg: Option<i32>) -> PurchaseHistoryEntity {
        let now = Utc::now();
        PurchaseHistoryEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            item_name: "milk".to_string(),
            category: None,
            purchase_count: 3,
            first_purchased_at: Some(now - Duration::days(10)),
            last_purchased_at: now,
            average_days_between_purchases: avg,
            audit: AuditInfo::on_insert(now, None),
            tombstone: Tombstone::live(),
        }
    }

    #[test]
    fn test_due_at_requires_cadence() {
        assert!(entity(None).due_at().is_none());
    }

    #[test]
    fn test_due_at_adds_average_days() {
        let e = entity(Some(5));
        assert_eq!(e.due_at(), Some(e.last_purchased_at + Duration::days(5)));
    }

    #[test]
    fn test_to_suggestion_carries_fields() {
        let e = entity(Some(4));
        let suggestion = e.to_suggestion();
        assert_eq!(suggestion.item_name, "milk");
        assert_eq!(suggestion.purchase_count, 3);
        assert_eq!(suggestion.due_at, e.due_at());
    }
}
