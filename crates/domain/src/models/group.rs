//! Group and membership domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::audit::{AuditInfo, Tombstone};
use super::role::GroupRole;

/// Default member cap for a new group.
pub const DEFAULT_MAX_MEMBERS: i32 = 10;

/// Hard upper bound on the member cap.
pub const MAX_GROUP_MEMBERS: i32 = 100;

/// A collaboration boundary owning members, lists, and invitations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub invite_code: Option<String>,
    pub invite_code_expires: Option<DateTime<Utc>>,
    pub allow_members_to_invite: bool,
    pub max_members: i32,
    #[serde(flatten)]
    pub audit: AuditInfo,
    #[serde(flatten)]
    pub tombstone: Tombstone,
}

/// A user's membership in a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GroupMember {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: GroupRole,
    pub joined_at: DateTime<Utc>,
    pub invited_by: Option<Uuid>,
    pub last_activity_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub audit: AuditInfo,
    #[serde(flatten)]
    pub tombstone: Tombstone,
}

/// Request payload for creating a group.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateGroupRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub name: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    #[validate(range(min = 1, max = 100, message = "Max members must be between 1 and 100"))]
    pub max_members: Option<i32>,
}

/// Request payload for updating group settings.
#[derive(Debug, Clone, Deserialize, Validate, Default)]
#[serde(rename_all = "snake_case")]
pub struct UpdateGroupRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    pub allow_members_to_invite: Option<bool>,

    #[validate(range(min = 1, max = 100, message = "Max members must be between 1 and 100"))]
    pub max_members: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_group_request_valid() {
        let request = CreateGroupRequest {
            name: "Household".to_string(),
            description: Some("Weekly groceries".to_string()),
            max_members: Some(6),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_create_group_request_empty_name() {
        let request = CreateGroupRequest {
            name: "".to_string(),
            description: None,
            max_members: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_create_group_request_max_members_bounds() {
        let request = CreateGroupRequest {
            name: "Household".to_string(),
            description: None,
            max_members: Some(0),
        };
        assert!(request.validate().is_err());

        let request = CreateGroupRequest {
            name: "Household".to_string(),
            description: None,
            max_members: Some(101),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_update_group_request_all_optional() {
        assert!(UpdateGroupRequest::default().validate().is_ok());
    }
}
