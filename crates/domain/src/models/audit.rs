//! Audit and soft-delete value types embedded in every entity.
//!
//! A "delete" anywhere in this system sets the tombstone, never removes the
//! row. Reads exclude tombstoned rows unless they go through an explicit
//! include-deleted path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Creation/modification stamps carried by every entity.
///
/// `created_by`/`updated_by` are `None` for system-initiated writes; the
/// acting user is always threaded in explicitly by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AuditInfo {
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

impl AuditInfo {
    /// Stamps for a freshly inserted row; update stamps mirror creation.
    pub fn on_insert(now: DateTime<Utc>, acting_user_id: Option<Uuid>) -> Self {
        Self {
            created_at: now,
            created_by: acting_user_id,
            updated_at: now,
            updated_by: acting_user_id,
        }
    }

    /// Refreshes the update stamps only.
    pub fn on_update(&mut self, now: DateTime<Utc>, acting_user_id: Option<Uuid>) {
        self.updated_at = now;
        self.updated_by = acting_user_id;
    }
}

/// Soft-delete marker carried by every entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, Default)]
pub struct Tombstone {
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
}

impl Tombstone {
    /// A live (non-deleted) marker.
    pub fn live() -> Self {
        Self::default()
    }

    /// Marks the row deleted.
    pub fn mark_deleted(&mut self, now: DateTime<Utc>, acting_user_id: Option<Uuid>) {
        self.is_deleted = true;
        self.deleted_at = Some(now);
        self.deleted_by = acting_user_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_insert_mirrors_update_stamps() {
        let now = Utc::now();
        let actor = Some(Uuid::new_v4());
        let audit = AuditInfo::on_insert(now, actor);
        assert_eq!(audit.created_at, audit.updated_at);
        assert_eq!(audit.created_by, audit.updated_by);
        assert_eq!(audit.created_by, actor);
    }

    #[test]
    fn test_on_update_keeps_creation_stamps() {
        let created = Utc::now();
        let creator = Some(Uuid::new_v4());
        let mut audit = AuditInfo::on_insert(created, creator);

        let later = created + chrono::Duration::minutes(5);
        let editor = Some(Uuid::new_v4());
        audit.on_update(later, editor);

        assert_eq!(audit.created_at, created);
        assert_eq!(audit.created_by, creator);
        assert_eq!(audit.updated_at, later);
        assert_eq!(audit.updated_by, editor);
    }

    #[test]
    fn test_system_writes_have_no_actor() {
        let audit = AuditInfo::on_insert(Utc::now(), None);
        assert!(audit.created_by.is_none());
        assert!(audit.updated_by.is_none());
    }

    #[test]
    fn test_tombstone_live_then_deleted() {
        let mut tombstone = Tombstone::live();
        assert!(!tombstone.is_deleted);
        assert!(tombstone.deleted_at.is_none());

        let now = Utc::now();
        let actor = Some(Uuid::new_v4());
        tombstone.mark_deleted(now, actor);
        assert!(tombstone.is_deleted);
        assert_eq!(tombstone.deleted_at, Some(now));
        assert_eq!(tombstone.deleted_by, actor);
    }
}
