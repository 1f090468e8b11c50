//! Domain model definitions.

pub mod audit;
pub mod group;
pub mod invitation;
pub mod purchase_history;
pub mod role;
pub mod shopping_item;
pub mod shopping_list;
pub mod user;

pub use audit::{AuditInfo, Tombstone};
pub use group::{
    CreateGroupRequest, Group, GroupMember, UpdateGroupRequest, DEFAULT_MAX_MEMBERS,
    MAX_GROUP_MEMBERS,
};
pub use invitation::{
    CreateInvitationRequest, Invitation, InvitationResolution, InvitationStatus,
    DEFAULT_INVITATION_EXPIRY_DAYS,
};
pub use purchase_history::{day_gap, next_average_days, PurchaseHistory, PurchaseSuggestion};
pub use role::{GroupAction, GroupRole};
pub use shopping_item::{
    plan_reorder, AddItemRequest, ItemPatch, MarkPurchasedRequest, ReorderOutcome, ShoppingItem,
};
pub use shopping_list::{CreateListRequest, ShoppingList, UpdateListRequest};
pub use user::{AuthenticatedUser, LoginRequest, RegisterRequest, User};
