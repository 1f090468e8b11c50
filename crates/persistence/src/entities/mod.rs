//! Entity definitions (database row mappings).

pub mod group;
pub mod group_member;
pub mod invitation;
pub mod purchase_history;
pub mod shopping_item;
pub mod shopping_list;
pub mod user;

pub use group::{GroupEntity, GroupRoleDb};
pub use group_member::GroupMemberEntity;
pub use invitation::{InvitationEntity, InvitationStatusDb};
pub use purchase_history::PurchaseHistoryEntity;
pub use shopping_item::ShoppingItemEntity;
pub use shopping_list::ShoppingListEntity;
pub use user::UserEntity;
