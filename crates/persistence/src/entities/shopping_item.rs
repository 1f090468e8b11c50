//! Shopping item entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{AuditInfo, ShoppingItem, Tombstone};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the shopping_items table.
///
/// `version` is the optimistic lock; it is only ever changed by the
/// conditional updates in the item repository.
#[derive(Debug, Clone, FromRow)]
pub struct ShoppingItemEntity {
    pub id: Uuid,
    pub list_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub notes: Option<String>,
    pub category: Option<String>,
    pub is_urgent: bool,
    pub is_purchased: bool,
    pub purchased_at: Option<DateTime<Utc>>,
    pub purchased_by: Option<Uuid>,
    pub purchased_quantity: Option<i32>,
    pub added_by_user_id: Uuid,
    pub version: i32,
    pub is_synced: bool,
    pub display_order: i32,
    #[sqlx(flatten)]
    pub audit: AuditInfo,
    #[sqlx(flatten)]
    pub tombstone: Tombstone,
}

impl From<ShoppingItemEntity> for ShoppingItem {
    fn from(entity: ShoppingItemEntity) -> Self {
        Self {
            id: entity.id,
            list_id: entity.list_id,
            name: entity.name,
            quantity: entity.quantity,
            notes: entity.notes,
            category: entity.category,
            is_urgent: entity.is_urgent,
            is_purchased: entity.is_purchased,
            purchased_at: entity.purchased_at,
            purchased_by: entity.purchased_by,
            purchased_quantity: entity.purchased_quantity,
            added_by_user_id: entity.added_by_user_id,
            version: entity.version,
            is_synced: entity.is_synced,
            display_order: entity.display_order,
            audit: entity.audit,
            tombstone: entity.tombstone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_to_model_preserves_version() {
        let now = Utc::now();
        let entity = ShoppingItemEntity {
            id: Uuid::new_v4(),
            list_id: Uuid::new_v4(),
            name: "Milk".to_string(),
            quantity: 5,
            notes: None,
            category: Some("Dairy".to_string()),
            is_urgent: false,
            is_purchased: false,
            purchased_at: None,
            purchased_by: None,
            purchased_quantity: None,
            added_by_user_id: Uuid::new_v4(),
            version: 3,
            is_synced: true,
            display_order: 2,
            audit: AuditInfo::on_insert(now, None),
            tombstone: Tombstone::live(),
        };

        let item: ShoppingItem = entity.into();
        assert_eq!(item.version, 3);
        assert_eq!(item.display_order, 2);
    }
}
