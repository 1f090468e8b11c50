//! Group member entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{AuditInfo, GroupMember, Tombstone};
use sqlx::FromRow;
use uuid::Uuid;

use super::group::GroupRoleDb;

/// Database row mapping for the group_members table.
#[derive(Debug, Clone, FromRow)]
pub struct GroupMemberEntity {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: GroupRoleDb,
    pub joined_at: DateTime<Utc>,
    pub invited_by: Option<Uuid>,
    pub last_activity_at: Option<DateTime<Utc>>,
    #[sqlx(flatten)]
    pub audit: AuditInfo,
    #[sqlx(flatten)]
    pub tombstone: Tombstone,
}

impl From<GroupMemberEntity> for GroupMember {
    fn from(entity: GroupMemberEntity) -> Self {
        Self {
            id: entity.id,
            group_id: entity.group_id,
            user_id: entity.user_id,
            role: entity.role.into(),
            joined_at: entity.joined_at,
            invited_by: entity.invited_by,
            last_activity_at: entity.last_activity_at,
            audit: entity.audit,
            tombstone: entity.tombstone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::GroupRole;

    #[test]
    fn test_entity_to_model_parses_role() {
        let now = Utc::now();
        let entity = GroupMemberEntity {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role: GroupRoleDb::Admin,
            joined_at: now,
            invited_by: None,
            last_activity_at: None,
            audit: AuditInfo::on_insert(now, None),
            tombstone: Tombstone::live(),
        };

        let member: GroupMember = entity.into();
        assert_eq!(member.role, GroupRole::Admin);
    }
}
