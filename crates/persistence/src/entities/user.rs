//! User entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{AuditInfo, Tombstone, User};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub is_email_verified: bool,
    pub email_verification_token: Option<String>,
    pub email_verification_token_expiry: Option<DateTime<Utc>>,
    pub password_reset_token: Option<String>,
    pub password_reset_token_expiry: Option<DateTime<Utc>>,
    pub language: Option<String>,
    #[sqlx(flatten)]
    pub audit: AuditInfo,
    #[sqlx(flatten)]
    pub tombstone: Tombstone,
}

impl From<UserEntity> for User {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: entity.id,
            email: entity.email,
            password_hash: entity.password_hash,
            full_name: entity.full_name,
            is_email_verified: entity.is_email_verified,
            language: entity.language,
            audit: entity.audit,
            tombstone: entity.tombstone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_to_model_drops_token_fields() {
        let now = Utc::now();
        let entity = UserEntity {
            id: Uuid::new_v4(),
            email: "ana@example.com".to_string(),
            password_hash: "$argon2id$...".to_string(),
            full_name: "Ana Souza".to_string(),
            is_email_verified: true,
            email_verification_token: Some("secret".to_string()),
            email_verification_token_expiry: Some(now),
            password_reset_token: None,
            password_reset_token_expiry: None,
            language: Some("pt-br".to_string()),
            audit: AuditInfo::on_insert(now, None),
            tombstone: Tombstone::live(),
        };

        let user: User = entity.into();
        assert_eq!(user.email, "ana@example.com");
        assert!(user.is_email_verified);
    }
}
