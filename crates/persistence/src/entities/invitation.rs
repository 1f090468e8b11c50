//! Invitation entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{AuditInfo, Invitation, InvitationStatus, Tombstone};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum mapping to the PostgreSQL `invitation_status` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "invitation_status", rename_all = "lowercase")]
pub enum InvitationStatusDb {
    Pending,
    Accepted,
    Declined,
    Expired,
    Revoked,
}

impl From<InvitationStatusDb> for InvitationStatus {
    fn from(status: InvitationStatusDb) -> Self {
        match status {
            InvitationStatusDb::Pending => InvitationStatus::Pending,
            InvitationStatusDb::Accepted => InvitationStatus::Accepted,
            InvitationStatusDb::Declined => InvitationStatus::Declined,
            InvitationStatusDb::Expired => InvitationStatus::Expired,
            InvitationStatusDb::Revoked => InvitationStatus::Revoked,
        }
    }
}

impl From<InvitationStatus> for InvitationStatusDb {
    fn from(status: InvitationStatus) -> Self {
        match status {
            InvitationStatus::Pending => InvitationStatusDb::Pending,
            InvitationStatus::Accepted => InvitationStatusDb::Accepted,
            InvitationStatus::Declined => InvitationStatusDb::Declined,
            InvitationStatus::Expired => InvitationStatusDb::Expired,
            InvitationStatus::Revoked => InvitationStatusDb::Revoked,
        }
    }
}

/// Database row mapping for the invitations table.
#[derive(Debug, Clone, FromRow)]
pub struct InvitationEntity {
    pub id: Uuid,
    pub group_id: Uuid,
    pub invited_email: String,
    pub invited_user_id: Option<Uuid>,
    pub invited_by: Uuid,
    pub status: InvitationStatusDb,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub message: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    #[sqlx(flatten)]
    pub audit: AuditInfo,
    #[sqlx(flatten)]
    pub tombstone: Tombstone,
}

impl From<InvitationEntity> for Invitation {
    fn from(entity: InvitationEntity) -> Self {
        Self {
            id: entity.id,
            group_id: entity.group_id,
            invited_email: entity.invited_email,
            invited_user_id: entity.invited_user_id,
            invited_by: entity.invited_by,
            status: entity.status.into(),
            token: entity.token,
            expires_at: entity.expires_at,
            message: entity.message,
            responded_at: entity.responded_at,
            audit: entity.audit,
            tombstone: entity.tombstone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_db_round_trip() {
        for status in [
            InvitationStatus::Pending,
            InvitationStatus::Accepted,
            InvitationStatus::Declined,
            InvitationStatus::Expired,
            InvitationStatus::Revoked,
        ] {
            let db: InvitationStatusDb = status.into();
            let back: InvitationStatus = db.into();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn test_entity_to_model() {
        let now = Utc::now();
        let entity = InvitationEntity {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            invited_email: "invitee@example.com".to_string(),
            invited_user_id: None,
            invited_by: Uuid::new_v4(),
            status: InvitationStatusDb::Pending,
            token: "tok".to_string(),
            expires_at: now + chrono::Duration::days(7),
            message: Some("Join us".to_string()),
            responded_at: None,
            audit: AuditInfo::on_insert(now, None),
            tombstone: Tombstone::live(),
        };

        let invitation: Invitation = entity.into();
        assert_eq!(invitation.status, InvitationStatus::Pending);
        assert!(invitation.responded_at.is_none());
    }
}
