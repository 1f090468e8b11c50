//! Group entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{AuditInfo, Group, GroupRole, Tombstone};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum mapping to the PostgreSQL `group_role` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "group_role", rename_all = "lowercase")]
pub enum GroupRoleDb {
    Owner,
    Admin,
    Member,
    Viewer,
}

impl From<GroupRoleDb> for GroupRole {
    fn from(db_role: GroupRoleDb) -> Self {
        match db_role {
            GroupRoleDb::Owner => GroupRole::Owner,
            GroupRoleDb::Admin => GroupRole::Admin,
            GroupRoleDb::Member => GroupRole::Member,
            GroupRoleDb::Viewer => GroupRole::Viewer,
        }
    }
}

impl From<GroupRole> for GroupRoleDb {
    fn from(role: GroupRole) -> Self {
        match role {
            GroupRole::Owner => GroupRoleDb::Owner,
            GroupRole::Admin => GroupRoleDb::Admin,
            GroupRole::Member => GroupRoleDb::Member,
            GroupRole::Viewer => GroupRoleDb::Viewer,
        }
    }
}

/// Database row mapping for the groups table.
#[derive(Debug, Clone, FromRow)]
pub struct GroupEntity {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub invite_code: Option<String>,
    pub invite_code_expires: Option<DateTime<Utc>>,
    pub allow_members_to_invite: bool,
    pub max_members: i32,
    #[sqlx(flatten)]
    pub audit: AuditInfo,
    #[sqlx(flatten)]
    pub tombstone: Tombstone,
}

impl GroupEntity {
    /// True if the shareable invite code is present and unexpired at `now`.
    pub fn invite_code_usable(&self, now: DateTime<Utc>) -> bool {
        match (&self.invite_code, self.invite_code_expires) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(_), Some(expires)) => expires > now,
        }
    }
}

impl From<GroupEntity> for Group {
    fn from(entity: GroupEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            description: entity.description,
            owner_id: entity.owner_id,
            invite_code: entity.invite_code,
            invite_code_expires: entity.invite_code_expires,
            allow_members_to_invite: entity.allow_members_to_invite,
            max_members: entity.max_members,
            audit: entity.audit,
            tombstone: entity.tombstone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn group(invite_code: Option<&str>, expires: Option<DateTime<Utc>>) -> GroupEntity {
        let now = Utc::now();
        GroupEntity {
            id: Uuid::new_v4(),
            name: "Household".to_string(),
            description: None,
            owner_id: Uuid::new_v4(),
            invite_code: invite_code.map(str::to_string),
            invite_code_expires: expires,
            allow_members_to_invite: true,
            max_members: 10,
            audit: AuditInfo::on_insert(now, None),
            tombstone: Tombstone::live(),
        }
    }

    #[test]
    fn test_invite_code_usable_without_expiry() {
        let entity = group(Some("ABCD2345"), None);
        assert!(entity.invite_code_usable(Utc::now()));
    }

    #[test]
    fn test_invite_code_unusable_when_absent() {
        let entity = group(None, None);
        assert!(!entity.invite_code_usable(Utc::now()));
    }

    #[test]
    fn test_invite_code_expires() {
        let now = Utc::now();
        let entity = group(Some("ABCD2345"), Some(now - Duration::hours(1)));
        assert!(!entity.invite_code_usable(now));

        let entity = group(Some("ABCD2345"), Some(now + Duration::hours(1)));
        assert!(entity.invite_code_usable(now));
    }

    #[test]
    fn test_role_db_round_trip() {
        for role in [
            GroupRole::Owner,
            GroupRole::Admin,
            GroupRole::Member,
            GroupRole::Viewer,
        ] {
            let db: GroupRoleDb = role.into();
            let back: GroupRole = db.into();
            assert_eq!(back, role);
        }
    }
}
