//! Shopping item synchronization commands.
//!
//! Every mutation is gated on the version the caller last observed. On a
//! mismatch the command fails with a conflict carrying the authoritative
//! current item; the caller re-reads, re-merges, and resubmits. The core
//! never auto-merges user-authored content.

use std::sync::Arc;

use domain::models::{AddItemRequest, GroupAction, ItemPatch, MarkPurchasedRequest, ReorderOutcome, ShoppingItem};
use persistence::entities::{GroupEntity, ShoppingItemEntity, ShoppingListEntity};
use persistence::repositories::{
    CasOutcome, GroupMemberRepository, GroupRepository, ShoppingItemRepository,
    ShoppingListRepository,
};
use shared::validation::{normalize_item_name, validate_purchased_quantity};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::capabilities::{Clock, SystemClock};
use crate::error::CoreError;
use crate::services::access;
use crate::services::history::{PurchaseEvent, RecorderHandle};

/// Shopping item sync service.
pub struct ItemService {
    groups: GroupRepository,
    members: GroupMemberRepository,
    lists: ShoppingListRepository,
    items: ShoppingItemRepository,
    clock: Arc<dyn Clock>,
    recorder: Option<RecorderHandle>,
}

impl ItemService {
    pub fn new(pool: PgPool, recorder: Option<RecorderHandle>) -> Self {
        Self::with_capabilities(pool, recorder, Arc::new(SystemClock))
    }

    pub fn with_capabilities(
        pool: PgPool,
        recorder: Option<RecorderHandle>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            groups: GroupRepository::new(pool.clone()),
            members: GroupMemberRepository::new(pool.clone()),
            lists: ShoppingListRepository::new(pool.clone()),
            items: ShoppingItemRepository::new(pool),
            clock,
            recorder,
        }
    }

    /// Adds an item to the end of a list at version 1.
    pub async fn add_item(
        &self,
        list_id: Uuid,
        acting_user_id: Uuid,
        request: AddItemRequest,
    ) -> Result<ShoppingItem, CoreError> {
        request.validate()?;
        let (list, _) = self
            .authorized_list(list_id, acting_user_id, GroupAction::EditLists)
            .await?;

        let now = self.clock.now();
        let item = self
            .items
            .add(
                list.id,
                request.name.trim(),
                request.quantity,
                request.notes.as_deref(),
                request.category.as_deref(),
                request.is_urgent,
                acting_user_id,
                now,
            )
            .await?;
        self.members
            .touch_activity(list.group_id, acting_user_id, now)
            .await?;
        Ok(item.into())
    }

    /// Lists a list's items in display order.
    pub async fn list_items(
        &self,
        list_id: Uuid,
        acting_user_id: Uuid,
    ) -> Result<Vec<ShoppingItem>, CoreError> {
        self.authorized_list(list_id, acting_user_id, GroupAction::ViewLists)
            .await?;
        let items = self.items.list_by_list(list_id).await?;
        Ok(items.into_iter().map(Into::into).collect())
    }

    /// Applies a field patch if the caller's version is current.
    ///
    /// An empty patch is a no-op returning the current item without a
    /// version bump.
    pub async fn update_item(
        &self,
        item_id: Uuid,
        patch: ItemPatch,
        expected_version: i32,
        acting_user_id: Uuid,
    ) -> Result<ShoppingItem, CoreError> {
        patch.validate()?;
        let (item, list, _) = self
            .authorized_item(item_id, acting_user_id, GroupAction::EditLists)
            .await?;

        if patch.is_empty() {
            if item.version != expected_version {
                return Err(conflict(item));
            }
            return Ok(item.into());
        }

        let now = self.clock.now();
        let outcome = self
            .items
            .update_fields(
                item_id,
                expected_version,
                patch.name.as_deref().map(str::trim),
                patch.quantity,
                patch.notes.as_deref(),
                patch.category.as_deref(),
                patch.is_urgent,
                Some(acting_user_id),
                now,
            )
            .await?;
        let updated = map_cas(outcome)?;
        self.members
            .touch_activity(list.group_id, acting_user_id, now)
            .await?;
        Ok(updated)
    }

    /// Marks an item purchased, version gated, and queues the purchase for
    /// history aggregation. Re-purchasing an already purchased item is
    /// allowed and refreshes the purchase stamp.
    pub async fn mark_purchased(
        &self,
        item_id: Uuid,
        request: MarkPurchasedRequest,
        acting_user_id: Uuid,
    ) -> Result<ShoppingItem, CoreError> {
        let (item, list, _) = self
            .authorized_item(item_id, acting_user_id, GroupAction::EditLists)
            .await?;

        if item.version != request.expected_version {
            return Err(conflict(item));
        }
        if let Some(purchased) = request.purchased_quantity {
            validate_purchased_quantity(purchased, item.quantity)
                .map_err(|e| CoreError::Validation(render_validation(e)))?;
        }

        let now = self.clock.now();
        let outcome = self
            .items
            .mark_purchased(
                item_id,
                request.expected_version,
                acting_user_id,
                request.purchased_quantity,
                now,
            )
            .await?;
        let updated = map_cas(outcome)?;

        if let Some(recorder) = &self.recorder {
            recorder.enqueue(PurchaseEvent {
                user_id: acting_user_id,
                group_id: list.group_id,
                item_name: normalize_item_name(&updated.name),
                category: updated.category.clone(),
                purchased_at: now,
            });
        }
        self.members
            .touch_activity(list.group_id, acting_user_id, now)
            .await?;
        Ok(updated)
    }

    /// Clears the purchased state, version gated.
    pub async fn unmark_purchased(
        &self,
        item_id: Uuid,
        expected_version: i32,
        acting_user_id: Uuid,
    ) -> Result<ShoppingItem, CoreError> {
        self.authorized_item(item_id, acting_user_id, GroupAction::EditLists)
            .await?;

        let now = self.clock.now();
        let outcome = self
            .items
            .unmark_purchased(item_id, expected_version, Some(acting_user_id), now)
            .await?;
        map_cas(outcome)
    }

    /// Tombstones an item, version gated.
    pub async fn delete_item(
        &self,
        item_id: Uuid,
        expected_version: i32,
        acting_user_id: Uuid,
    ) -> Result<(), CoreError> {
        self.authorized_item(item_id, acting_user_id, GroupAction::EditLists)
            .await?;

        let now = self.clock.now();
        let outcome = self
            .items
            .soft_delete(item_id, expected_version, Some(acting_user_id), now)
            .await?;
        map_cas(outcome)?;
        Ok(())
    }

    /// Rewrites a list's display order. Items deleted concurrently are
    /// skipped and reported in the outcome rather than failing the command.
    pub async fn reorder_items(
        &self,
        list_id: Uuid,
        ordered_item_ids: &[Uuid],
        acting_user_id: Uuid,
    ) -> Result<ReorderOutcome, CoreError> {
        self.authorized_list(list_id, acting_user_id, GroupAction::EditLists)
            .await?;

        let now = self.clock.now();
        let outcome = self
            .items
            .reorder(list_id, ordered_item_ids, Some(acting_user_id), now)
            .await?;
        Ok(outcome)
    }

    async fn authorized_list(
        &self,
        list_id: Uuid,
        acting_user_id: Uuid,
        action: GroupAction,
    ) -> Result<(ShoppingListEntity, GroupEntity), CoreError> {
        let list = self
            .lists
            .find_by_id(list_id)
            .await?
            .ok_or(CoreError::NotFound("list"))?;
        let group = self
            .groups
            .find_by_id(list.group_id)
            .await?
            .ok_or(CoreError::NotFound("group"))?;
        access::require(&self.members, &group, acting_user_id, action).await?;
        Ok((list, group))
    }

    async fn authorized_item(
        &self,
        item_id: Uuid,
        acting_user_id: Uuid,
        action: GroupAction,
    ) -> Result<(ShoppingItemEntity, ShoppingListEntity, GroupEntity), CoreError> {
        let item = self
            .items
            .find_by_id(item_id)
            .await?
            .ok_or(CoreError::NotFound("item"))?;
        let (list, group) = self
            .authorized_list(item.list_id, acting_user_id, action)
            .await?;
        Ok((item, list, group))
    }
}

fn conflict(current: ShoppingItemEntity) -> CoreError {
    CoreError::Conflict {
        current: Box::new(current.into()),
    }
}

fn map_cas(outcome: CasOutcome) -> Result<ShoppingItem, CoreError> {
    match outcome {
        CasOutcome::Updated(item) => Ok(item.into()),
        CasOutcome::Conflict(current) => Err(conflict(current)),
        CasOutcome::NotFound => Err(CoreError::NotFound("item")),
    }
}

fn render_validation(err: validator::ValidationError) -> String {
    err.message
        .map(|m| m.to_string())
        .unwrap_or_else(|| err.code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::models::{AuditInfo, Tombstone};

    fn item_entity(version: i32, quantity: i32) -> ShoppingItemEntity {
        let now = Utc::now();
        ShoppingItemEntity {
            id: Uuid::new_v4(),
            list_id: Uuid::new_v4(),
            name: "Milk".to_string(),
            quantity,
            notes: None,
            category: None,
            is_urgent: false,
            is_purchased: false,
            purchased_at: None,
            purchased_by: None,
            purchased_quantity: None,
            added_by_user_id: Uuid::new_v4(),
            version,
            is_synced: true,
            display_order: 0,
            audit: AuditInfo::on_insert(now, None),
            tombstone: Tombstone::live(),
        }
    }

    #[test]
    fn test_map_cas_updated() {
        let result = map_cas(CasOutcome::Updated(item_entity(2, 5))).unwrap();
        assert_eq!(result.version, 2);
    }

    #[test]
    fn test_map_cas_conflict_carries_current_state() {
        let err = map_cas(CasOutcome::Conflict(item_entity(4, 5))).unwrap_err();
        match err {
            CoreError::Conflict { current } => assert_eq!(current.version, 4),
            other => panic!("expected Conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_map_cas_not_found() {
        assert!(matches!(
            map_cas(CasOutcome::NotFound),
            Err(CoreError::NotFound("item"))
        ));
    }

    #[test]
    fn test_conflict_helper_boxes_entity() {
        let err = conflict(item_entity(7, 3));
        match err {
            CoreError::Conflict { current } => {
                assert_eq!(current.version, 7);
                assert_eq!(current.quantity, 3);
            }
            other => panic!("expected Conflict, got {:?}", other),
        }
    }
}
