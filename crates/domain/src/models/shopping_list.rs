//! Shopping list domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use shared::validation::validate_hex_color;

use super::audit::{AuditInfo, Tombstone};

/// A named collection of items inside a group.
///
/// `is_archived` is a business state distinct from the tombstone: archived
/// lists remain readable, tombstoned lists do not.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ShoppingList {
    pub id: Uuid,
    pub group_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by_user_id: Uuid,
    pub is_archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub color: Option<String>,
    pub icon: Option<String>,
    #[serde(flatten)]
    pub audit: AuditInfo,
    #[serde(flatten)]
    pub tombstone: Tombstone,
}

/// Request payload for creating a list.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateListRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub name: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    #[validate(custom(function = "validate_hex_color"))]
    pub color: Option<String>,

    #[validate(length(max = 50, message = "Icon must be at most 50 characters"))]
    pub icon: Option<String>,
}

/// Request payload for updating a list.
#[derive(Debug, Clone, Deserialize, Validate, Default)]
#[serde(rename_all = "snake_case")]
pub struct UpdateListRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    #[validate(custom(function = "validate_hex_color"))]
    pub color: Option<String>,

    #[validate(length(max = 50, message = "Icon must be at most 50 characters"))]
    pub icon: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_list_request_valid() {
        let request = CreateListRequest {
            name: "Groceries".to_string(),
            description: None,
            color: Some("#33cc99".to_string()),
            icon: Some("cart".to_string()),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_create_list_request_bad_color() {
        let request = CreateListRequest {
            name: "Groceries".to_string(),
            description: None,
            color: Some("green".to_string()),
            icon: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_update_list_request_all_optional() {
        assert!(UpdateListRequest::default().validate().is_ok());
    }
}
