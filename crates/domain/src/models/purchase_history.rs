//! Purchase history domain models and cadence math.
//!
//! One row per `(user, group, item name)` tracks how often an item is
//! bought. Item names match by trimmed, case-insensitive equality; fuzzy
//! matching is layered on elsewhere if at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::audit::{AuditInfo, Tombstone};

/// Rolling purchase statistic for one item name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PurchaseHistory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub item_name: String,
    pub category: Option<String>,
    pub purchase_count: i32,
    pub first_purchased_at: Option<DateTime<Utc>>,
    pub last_purchased_at: DateTime<Utc>,
    pub average_days_between_purchases: Option<i32>,
    #[serde(flatten)]
    pub audit: AuditInfo,
    #[serde(flatten)]
    pub tombstone: Tombstone,
}

/// A repurchase suggestion derived from history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PurchaseSuggestion {
    pub item_name: String,
    pub purchase_count: i32,
    pub last_purchased_at: DateTime<Utc>,
    pub average_days_between_purchases: Option<i32>,
    /// Projected next purchase date, when a cadence is known.
    pub due_at: Option<DateTime<Utc>>,
}

/// Whole-day gap between two successive purchases, floored at zero.
pub fn day_gap(previous: DateTime<Utc>, when: DateTime<Utc>) -> i64 {
    (when - previous).num_days().max(0)
}

/// Running mean of day-gaps after the `purchase_count`-th purchase.
///
/// `new_avg = ((n - 1) * old_avg + gap) / n`, rounded to the nearest whole
/// day. `purchase_count` is the count including the purchase that produced
/// `gap_days`, so it is at least 2 here.
pub fn next_average_days(purchase_count: i32, old_avg: Option<i32>, gap_days: i64) -> i32 {
    debug_assert!(purchase_count >= 2);
    // The first gap has no prior average; n = 2 makes the mean the gap itself.
    let gaps = (purchase_count - 1) as f64;
    let prior = old_avg.unwrap_or(0) as f64;
    let mean = ((gaps - 1.0) * prior + gap_days as f64) / gaps;
    mean.round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_day_gap_whole_days() {
        let first = Utc::now();
        assert_eq!(day_gap(first, first + Duration::days(4)), 4);
        assert_eq!(day_gap(first, first + Duration::hours(47)), 1);
    }

    #[test]
    fn test_day_gap_never_negative() {
        let first = Utc::now();
        assert_eq!(day_gap(first, first - Duration::days(2)), 0);
    }

    #[test]
    fn test_second_purchase_sets_average_to_gap() {
        assert_eq!(next_average_days(2, None, 4), 4);
    }

    #[test]
    fn test_milk_three_purchases_gaps_four_and_six() {
        // Buying "Milk" at day-gaps of 4 then 6 yields an average of 5.
        let after_second = next_average_days(2, None, 4);
        assert_eq!(after_second, 4);
        let after_third = next_average_days(3, Some(after_second), 6);
        assert_eq!(after_third, 5);
    }

    #[test]
    fn test_average_rounds_to_nearest_day() {
        // Gaps 3 and 4: mean 3.5 rounds to 4.
        let avg = next_average_days(3, Some(3), 4);
        assert_eq!(avg, 4);
        // Gaps 3, 3, 4: mean 3.33 rounds to 3.
        let avg = next_average_days(4, Some(3), 4);
        assert_eq!(avg, 3);
    }

    #[test]
    fn test_same_day_repurchase_pulls_average_down() {
        let avg = next_average_days(3, Some(6), 0);
        assert_eq!(avg, 3);
    }
}
