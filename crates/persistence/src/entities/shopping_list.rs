//! Shopping list entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{AuditInfo, ShoppingList, Tombstone};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the shopping_lists table.
#[derive(Debug, Clone, FromRow)]
pub struct ShoppingListEntity {
    pub id: Uuid,
    pub group_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by_user_id: Uuid,
    pub is_archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub color: Option<String>,
    pub icon: Option<String>,
    #[sqlx(flatten)]
    pub audit: AuditInfo,
    #[sqlx(flatten)]
    pub tombstone: Tombstone,
}

impl From<ShoppingListEntity> for ShoppingList {
    fn from(entity: ShoppingListEntity) -> Self {
        Self {
            id: entity.id,
            group_id: entity.group_id,
            name: entity.name,
            description: entity.description,
            created_by_user_id: entity.created_by_user_id,
            is_archived: entity.is_archived,
            archived_at: entity.archived_at,
            color: entity.color,
            icon: entity.icon,
            audit: entity.audit,
            tombstone: entity.tombstone,
        }
    }
}
