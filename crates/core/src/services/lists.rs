//! Shopping list operations.

use std::sync::Arc;

use domain::models::{CreateListRequest, GroupAction, ShoppingList, UpdateListRequest};
use persistence::repositories::{GroupMemberRepository, GroupRepository, ShoppingListRepository};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::capabilities::{Clock, SystemClock};
use crate::error::CoreError;
use crate::services::access;

/// Shopping list service.
pub struct ListService {
    groups: GroupRepository,
    members: GroupMemberRepository,
    lists: ShoppingListRepository,
    clock: Arc<dyn Clock>,
}

impl ListService {
    pub fn new(pool: PgPool) -> Self {
        Self::with_capabilities(pool, Arc::new(SystemClock))
    }

    pub fn with_capabilities(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self {
            groups: GroupRepository::new(pool.clone()),
            members: GroupMemberRepository::new(pool.clone()),
            lists: ShoppingListRepository::new(pool),
            clock,
        }
    }

    /// Creates a list in a group.
    pub async fn create_list(
        &self,
        group_id: Uuid,
        acting_user_id: Uuid,
        request: CreateListRequest,
    ) -> Result<ShoppingList, CoreError> {
        request.validate()?;
        let group = self
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or(CoreError::NotFound("group"))?;
        access::require(&self.members, &group, acting_user_id, GroupAction::EditLists).await?;

        let now = self.clock.now();
        let list = self
            .lists
            .create(
                group_id,
                &request.name,
                request.description.as_deref(),
                acting_user_id,
                request.color.as_deref(),
                request.icon.as_deref(),
                now,
            )
            .await?;
        Ok(list.into())
    }

    /// Fetches a list the caller may view.
    pub async fn get_list(
        &self,
        list_id: Uuid,
        acting_user_id: Uuid,
    ) -> Result<ShoppingList, CoreError> {
        let (list, _) = self
            .authorized_list(list_id, acting_user_id, GroupAction::ViewLists)
            .await?;
        Ok(list.into())
    }

    /// Lists a group's lists; archived lists are included on request.
    pub async fn list_lists(
        &self,
        group_id: Uuid,
        acting_user_id: Uuid,
        include_archived: bool,
    ) -> Result<Vec<ShoppingList>, CoreError> {
        let group = self
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or(CoreError::NotFound("group"))?;
        access::require(&self.members, &group, acting_user_id, GroupAction::ViewLists).await?;

        let lists = self.lists.list_by_group(group_id, include_archived).await?;
        Ok(lists.into_iter().map(Into::into).collect())
    }

    /// Updates list metadata.
    pub async fn update_list(
        &self,
        list_id: Uuid,
        acting_user_id: Uuid,
        request: UpdateListRequest,
    ) -> Result<ShoppingList, CoreError> {
        request.validate()?;
        self.authorized_list(list_id, acting_user_id, GroupAction::EditLists)
            .await?;

        let now = self.clock.now();
        let updated = self
            .lists
            .update(
                list_id,
                request.name.as_deref(),
                request.description.as_deref(),
                request.color.as_deref(),
                request.icon.as_deref(),
                Some(acting_user_id),
                now,
            )
            .await?
            .ok_or(CoreError::NotFound("list"))?;
        Ok(updated.into())
    }

    /// Archives a list. Archived lists stay readable, unlike tombstoned ones.
    pub async fn archive_list(
        &self,
        list_id: Uuid,
        acting_user_id: Uuid,
    ) -> Result<ShoppingList, CoreError> {
        self.set_archived(list_id, acting_user_id, true).await
    }

    /// Brings an archived list back.
    pub async fn unarchive_list(
        &self,
        list_id: Uuid,
        acting_user_id: Uuid,
    ) -> Result<ShoppingList, CoreError> {
        self.set_archived(list_id, acting_user_id, false).await
    }

    /// Tombstones a list and its items.
    pub async fn delete_list(
        &self,
        list_id: Uuid,
        acting_user_id: Uuid,
    ) -> Result<(), CoreError> {
        self.authorized_list(list_id, acting_user_id, GroupAction::EditLists)
            .await?;

        let now = self.clock.now();
        if !self
            .lists
            .soft_delete_cascade(list_id, Some(acting_user_id), now)
            .await?
        {
            return Err(CoreError::NotFound("list"));
        }
        Ok(())
    }

    async fn set_archived(
        &self,
        list_id: Uuid,
        acting_user_id: Uuid,
        archived: bool,
    ) -> Result<ShoppingList, CoreError> {
        self.authorized_list(list_id, acting_user_id, GroupAction::EditLists)
            .await?;

        let now = self.clock.now();
        let updated = self
            .lists
            .set_archived(list_id, archived, Some(acting_user_id), now)
            .await?
            .ok_or(CoreError::NotFound("list"))?;
        Ok(updated.into())
    }

    /// Loads the list, resolves its group, and checks the caller's role.
    async fn authorized_list(
        &self,
        list_id: Uuid,
        acting_user_id: Uuid,
        action: GroupAction,
    ) -> Result<
        (
            persistence::entities::ShoppingListEntity,
            persistence::entities::GroupEntity,
        ),
        CoreError,
    > {
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
}
