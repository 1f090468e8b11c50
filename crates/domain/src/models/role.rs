//! Group roles and the permission matrix.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Owner,
    Admin,
    Member,
    Viewer,
}

/// An action checked against the permission matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupAction {
    /// Manage group settings, remove members, revoke invitations.
    ManageGroup,
    /// Invite new members.
    InviteMembers,
    /// Create/edit lists and items.
    EditLists,
    /// View lists and items.
    ViewLists,
}

impl GroupRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupRole::Owner => "owner",
            GroupRole::Admin => "admin",
            GroupRole::Member => "member",
            GroupRole::Viewer => "viewer",
        }
    }

    /// Evaluates the permission matrix for this role.
    ///
    /// `allow_members_to_invite` is the group setting gating whether plain
    /// members may send invitations.
    pub fn allows(&self, action: GroupAction, allow_members_to_invite: bool) -> bool {
        match action {
            GroupAction::ManageGroup => matches!(self, GroupRole::Owner | GroupRole::Admin),
            GroupAction::InviteMembers => match self {
                GroupRole::Owner | GroupRole::Admin => true,
                GroupRole::Member => allow_members_to_invite,
                GroupRole::Viewer => false,
            },
            GroupAction::EditLists => {
                matches!(self, GroupRole::Owner | GroupRole::Admin | GroupRole::Member)
            }
            GroupAction::ViewLists => true,
        }
    }
}

impl FromStr for GroupRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(GroupRole::Owner),
            "admin" => Ok(GroupRole::Admin),
            "member" => Ok(GroupRole::Member),
            "viewer" => Ok(GroupRole::Viewer),
            _ => Err(format!("Invalid group role: {}", s)),
        }
    }
}

impl fmt::Display for GroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ROLES: [GroupRole; 4] = [
        GroupRole::Owner,
        GroupRole::Admin,
        GroupRole::Member,
        GroupRole::Viewer,
    ];

    #[test]
    fn test_manage_group_matrix() {
        assert!(GroupRole::Owner.allows(GroupAction::ManageGroup, true));
        assert!(GroupRole::Admin.allows(GroupAction::ManageGroup, true));
        assert!(!GroupRole::Member.allows(GroupAction::ManageGroup, true));
        assert!(!GroupRole::Viewer.allows(GroupAction::ManageGroup, true));
    }

    #[test]
    fn test_invite_matrix_respects_group_setting() {
        assert!(GroupRole::Owner.allows(GroupAction::InviteMembers, false));
        assert!(GroupRole::Admin.allows(GroupAction::InviteMembers, false));
        assert!(GroupRole::Member.allows(GroupAction::InviteMembers, true));
        assert!(!GroupRole::Member.allows(GroupAction::InviteMembers, false));
        assert!(!GroupRole::Viewer.allows(GroupAction::InviteMembers, true));
    }

    #[test]
    fn test_edit_lists_matrix() {
        assert!(GroupRole::Owner.allows(GroupAction::EditLists, true));
        assert!(GroupRole::Admin.allows(GroupAction::EditLists, true));
        assert!(GroupRole::Member.allows(GroupAction::EditLists, true));
        assert!(!GroupRole::Viewer.allows(GroupAction::EditLists, true));
    }

    #[test]
    fn test_everyone_can_view() {
        for role in ALL_ROLES {
            assert!(role.allows(GroupAction::ViewLists, false));
        }
    }

    #[test]
    fn test_role_round_trip() {
        for role in ALL_ROLES {
            assert_eq!(role.as_str().parse::<GroupRole>().unwrap(), role);
        }
    }

    #[test]
    fn test_role_parse_case_insensitive() {
        assert_eq!("OWNER".parse::<GroupRole>().unwrap(), GroupRole::Owner);
        assert_eq!("Admin".parse::<GroupRole>().unwrap(), GroupRole::Admin);
        assert!("superuser".parse::<GroupRole>().is_err());
    }
}
