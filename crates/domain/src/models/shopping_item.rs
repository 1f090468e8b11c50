//! Shopping item domain models and sync-engine rules.
//!
//! Items carry a monotonically incrementing `version` used as an optimistic
//! lock: every edit must present the version it last observed, and a mismatch
//! is a conflict carrying the authoritative server state. The engine never
//! auto-merges concurrent edits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use shared::validation::validate_quantity;

use super::audit::{AuditInfo, Tombstone};

/// One purchasable line entry in a shopping list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ShoppingItem {
    pub id: Uuid,
    pub list_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub notes: Option<String>,
    pub category: Option<String>,
    pub is_urgent: bool,
    pub is_purchased: bool,
    pub purchased_at: Option<DateTime<Utc>>,
    pub purchased_by: Option<Uuid>,
    pub purchased_quantity: Option<i32>,
    pub added_by_user_id: Uuid,
    pub version: i32,
    pub is_synced: bool,
    pub display_order: i32,
    #[serde(flatten)]
    pub audit: AuditInfo,
    #[serde(flatten)]
    pub tombstone: Tombstone,
}

/// Request payload for adding an item.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct AddItemRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Name must be between 1 and 200 characters"
    ))]
    pub name: String,

    #[validate(custom(function = "validate_quantity"))]
    pub quantity: i32,

    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,

    #[validate(length(max = 100, message = "Category must be at most 100 characters"))]
    pub category: Option<String>,

    #[serde(default)]
    pub is_urgent: bool,
}

/// Field patch applied by a version-gated item update.
///
/// Only the fields present are merged; absent fields keep their stored
/// values. Conflict policy is pushed to the caller: on a version mismatch
/// the whole patch is rejected.
#[derive(Debug, Clone, Deserialize, Validate, Default)]
#[serde(rename_all = "snake_case")]
pub struct ItemPatch {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Name must be between 1 and 200 characters"
    ))]
    pub name: Option<String>,

    #[validate(custom(function = "validate_quantity"))]
    pub quantity: Option<i32>,

    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,

    #[validate(length(max = 100, message = "Category must be at most 100 characters"))]
    pub category: Option<String>,

    pub is_urgent: Option<bool>,
}

impl ItemPatch {
    /// True when the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.quantity.is_none()
            && self.notes.is_none()
            && self.category.is_none()
            && self.is_urgent.is_none()
    }
}

/// Request payload for marking an item purchased.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct MarkPurchasedRequest {
    /// Partial purchase amount; when absent the full quantity is assumed.
    pub purchased_quantity: Option<i32>,

    /// The version the client last observed.
    pub expected_version: i32,
}

/// Result of a reorder command.
///
/// `failed_ids` lists requested items that no longer exist in the list
/// (deleted concurrently); the remaining items were reordered densely.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ReorderOutcome {
    pub reordered: usize,
    pub failed_ids: Vec<Uuid>,
}

impl ReorderOutcome {
    pub fn is_partial(&self) -> bool {
        !self.failed_ids.is_empty()
    }
}

/// Computes the final dense ordering for a reorder command.
///
/// `current` is the list's live items in their present display order;
/// `requested` is the caller-provided order. Requested items come first in
/// the given order; live items missing from the request keep their relative
/// order appended at the end. Requested ids not present in `current` are
/// skipped (reported separately as failures).
pub fn plan_reorder(current: &[Uuid], requested: &[Uuid]) -> Vec<Uuid> {
    let mut ordered: Vec<Uuid> = Vec::with_capacity(current.len());
    for id in requested {
        if current.contains(id) && !ordered.contains(id) {
            ordered.push(*id);
        }
    }
    for id in current {
        if !ordered.contains(id) {
            ordered.push(*id);
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn test_plan_reorder_full_permutation() {
        let current = ids(3);
        let requested = vec![current[2], current[0], current[1]];
        assert_eq!(plan_reorder(&current, &requested), requested);
    }

    #[test]
    fn test_plan_reorder_appends_missing_in_relative_order() {
        let current = ids(4);
        let requested = vec![current[3], current[1]];
        let planned = plan_reorder(&current, &requested);
        assert_eq!(
            planned,
            vec![current[3], current[1], current[0], current[2]]
        );
    }

    #[test]
    fn test_plan_reorder_skips_unknown_ids() {
        let current = ids(2);
        let stranger = Uuid::new_v4();
        let requested = vec![stranger, current[1], current[0]];
        assert_eq!(
            plan_reorder(&current, &requested),
            vec![current[1], current[0]]
        );
    }

    #[test]
    fn test_plan_reorder_ignores_duplicates() {
        let current = ids(2);
        let requested = vec![current[1], current[1], current[0]];
        assert_eq!(
            plan_reorder(&current, &requested),
            vec![current[1], current[0]]
        );
    }

    #[test]
    fn test_item_patch_is_empty() {
        assert!(ItemPatch::default().is_empty());
        let patch = ItemPatch {
            quantity: Some(3),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_add_item_request_quantity_must_be_positive() {
        let request = AddItemRequest {
            name: "Milk".to_string(),
            quantity: 0,
            notes: None,
            category: None,
            is_urgent: false,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_item_patch_validates_quantity() {
        let patch = ItemPatch {
            quantity: Some(-1),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn test_reorder_outcome_partial() {
        let ok = ReorderOutcome {
            reordered: 3,
            failed_ids: vec![],
        };
        assert!(!ok.is_partial());

        let partial = ReorderOutcome {
            reordered: 2,
            failed_ids: vec![Uuid::new_v4()],
        };
        assert!(partial.is_partial());
    }
}
