//! Repository for user account database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::UserEntity;
use crate::metrics::QueryTimer;

const USER_COLUMNS: &str = "id, email, password_hash, full_name, is_email_verified, \
     email_verification_token, email_verification_token_expiry, \
     password_reset_token, password_reset_token_expiry, language, \
     created_at, created_by, updated_at, updated_by, is_deleted, deleted_at, deleted_by";

/// Repository for user operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Creates a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a new user account.
    ///
    /// Self-registration is a system write: the audit actor is unset because
    /// the user id does not exist until the row is inserted.
    pub async fn create(
        &self,
        email: &str,
        password_hash: &str,
        full_name: &str,
        language: Option<&str>,
        verification_token: &str,
        verification_token_expiry: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<UserEntity, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (email, password_hash, full_name, language,
                               email_verification_token, email_verification_token_expiry,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, UserEntity>(&query)
            .bind(email)
            .bind(password_hash)
            .bind(full_name)
            .bind(language)
            .bind(verification_token)
            .bind(verification_token_expiry)
            .bind(now)
            .fetch_one(&self.pool)
            .await
    }

    /// Finds a live user by id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserEntity>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE id = $1 AND is_deleted = FALSE
            "#
        );
        sqlx::query_as::<_, UserEntity>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Finds a user by id including tombstoned rows (audit use only).
    pub async fn find_by_id_any(&self, id: Uuid) -> Result<Option<UserEntity>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE id = $1
            "#
        );
        sqlx::query_as::<_, UserEntity>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Finds a live user by email (case-insensitive).
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_email");
        let query = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE LOWER(email) = LOWER($1) AND is_deleted = FALSE
            "#
        );
        let result = sqlx::query_as::<_, UserEntity>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Marks the user's email verified if the token matches and is unexpired.
    ///
    /// Returns the user on success, `None` if the token is unknown, already
    /// used, or expired.
    pub async fn verify_email(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET is_email_verified = TRUE,
                email_verification_token = NULL,
                email_verification_token_expiry = NULL,
                updated_at = $2,
                updated_by = id
            WHERE email_verification_token = $1
              AND email_verification_token_expiry > $2
              AND is_deleted = FALSE
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, UserEntity>(&query)
            .bind(token)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
    }

    /// Stores a password reset token for the user.
    pub async fn set_password_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        token_expiry: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token = $2,
                password_reset_token_expiry = $3,
                updated_at = $4,
                updated_by = $1
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(token_expiry)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replaces the password hash if the reset token matches and is unexpired.
    ///
    /// The token is single use: it is cleared in the same update.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET password_hash = $2,
                password_reset_token = NULL,
                password_reset_token_expiry = NULL,
                updated_at = $3,
                updated_by = id
            WHERE password_reset_token = $1
              AND password_reset_token_expiry > $3
              AND is_deleted = FALSE
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, UserEntity>(&query)
            .bind(token)
            .bind(new_password_hash)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
    }

    /// Tombstones a user account.
    pub async fn soft_delete(
        &self,
        user_id: Uuid,
        acting_user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_deleted = TRUE,
                deleted_at = $2,
                deleted_by = $3,
                updated_at = $2,
                updated_by = $3
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(user_id)
        .bind(now)
        .bind(acting_user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
