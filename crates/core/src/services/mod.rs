//! Command services.
//!
//! Each service owns the repositories for one aggregate and exposes the
//! operations a transport layer calls. All role checks go through
//! [`access::require`] so the permission matrix is evaluated in exactly one
//! place.

pub mod auth;
pub mod groups;
pub mod history;
pub mod invitations;
pub mod items;
pub mod lists;
pub mod members;

pub use auth::AuthService;
pub use groups::GroupService;
pub use history::{HistoryService, PurchaseEvent, PurchaseRecorder, RecorderHandle};
pub use invitations::InvitationService;
pub use items::ItemService;
pub use lists::ListService;
pub use members::MemberService;

pub(crate) mod access {
    use domain::models::{GroupAction, GroupRole};
    use persistence::entities::GroupEntity;
    use persistence::repositories::GroupMemberRepository;
    use uuid::Uuid;

    use crate::error::CoreError;

    /// Resolves the caller's role in the group and checks it against the
    /// permission matrix. Non-members and tombstoned memberships read as
    /// "not a member".
    pub async fn require(
        members: &GroupMemberRepository,
        group: &GroupEntity,
        user_id: Uuid,
        action: GroupAction,
    ) -> Result<GroupRole, CoreError> {
        let member = members
            .find_active(group.id, user_id)
            .await?
            .ok_or(CoreError::PermissionDenied("not a member of this group"))?;
        let role: GroupRole = member.role.into();
        if role.allows(action, group.allow_members_to_invite) {
            Ok(role)
        } else {
            Err(CoreError::PermissionDenied(
                "role does not permit this action",
            ))
        }
    }
}
