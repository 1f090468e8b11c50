//! Repository implementations.
//!
//! Repositories own all SQL. Conventions:
//! - every read filters `is_deleted = FALSE`; `*_any` methods are the only
//!   exception and exist for audit views,
//! - deletes are tombstone updates, never `DELETE`,
//! - mutating methods take the acting user id and the command timestamp
//!   explicitly; `None` as actor marks a system write.

pub mod group;
pub mod group_member;
pub mod invitation;
pub mod purchase_history;
pub mod shopping_item;
pub mod shopping_list;
pub mod user;

pub use group::GroupRepository;
pub use group_member::{AddMemberOutcome, GroupMemberRepository};
pub use invitation::{AcceptOutcome, InvitationRepository, InvitationSummary, ResolveOutcome};
pub use purchase_history::PurchaseHistoryRepository;
pub use shopping_item::{CasOutcome, ShoppingItemRepository};
pub use shopping_list::ShoppingListRepository;
pub use user::UserRepository;
