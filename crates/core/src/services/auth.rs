//! User registration, login, and account token flows.

use std::sync::Arc;

use chrono::Duration;
use domain::models::{AuthenticatedUser, LoginRequest, RegisterRequest, User};
use persistence::repositories::UserRepository;
use shared::jwt::JwtConfig;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::capabilities::{
    ArgonPasswordVerifier, Clock, LoggingNotifier, Notifier, OpaqueTokenIssuer, PasswordVerifier,
    SystemClock, TokenIssuer,
};
use crate::config::InvitationConfig;
use crate::error::CoreError;

/// Authentication and account lifecycle service.
pub struct AuthService {
    users: UserRepository,
    jwt: JwtConfig,
    account_token_expiry_hours: i64,
    clock: Arc<dyn Clock>,
    passwords: Arc<dyn PasswordVerifier>,
    tokens: Arc<dyn TokenIssuer>,
    notifier: Arc<dyn Notifier>,
}

impl AuthService {
    /// Creates the service with the default capability wiring.
    pub fn new(pool: PgPool, jwt: JwtConfig, policy: &InvitationConfig) -> Self {
        Self::with_capabilities(
            pool,
            jwt,
            policy,
            Arc::new(SystemClock),
            Arc::new(ArgonPasswordVerifier),
            Arc::new(OpaqueTokenIssuer),
            Arc::new(LoggingNotifier),
        )
    }

    /// Creates the service with explicit capabilities (used by tests and
    /// transports that supply their own wiring).
    pub fn with_capabilities(
        pool: PgPool,
        jwt: JwtConfig,
        policy: &InvitationConfig,
        clock: Arc<dyn Clock>,
        passwords: Arc<dyn PasswordVerifier>,
        tokens: Arc<dyn TokenIssuer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            users: UserRepository::new(pool),
            jwt,
            account_token_expiry_hours: policy.account_token_expiry_hours,
            clock,
            passwords,
            tokens,
            notifier,
        }
    }

    /// Registers a new account and sends a verification token.
    ///
    /// Email uniqueness is checked among live accounts only; a tombstoned
    /// account frees its address.
    pub async fn register(&self, request: RegisterRequest) -> Result<User, CoreError> {
        request.validate()?;

        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(CoreError::Duplicate("email already registered"));
        }

        let now = self.clock.now();
        let password_hash = self.passwords.hash(&request.password)?;
        let verification_token = self.tokens.account_token();
        let token_expiry = now + Duration::hours(self.account_token_expiry_hours);

        let created = self
            .users
            .create(
                &request.email,
                &password_hash,
                &request.full_name,
                request.language.as_deref(),
                &verification_token,
                token_expiry,
                now,
            )
            .await
            .map_err(|err| match err {
                // Lost a race with a concurrent registration for the same email.
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    CoreError::Duplicate("email already registered")
                }
                other => other.into(),
            })?;

        self.notifier
            .send_verification(&created.email, &verification_token)
            .await;

        tracing::info!(user_id = %created.id, "user registered");
        Ok(created.into())
    }

    /// Verifies credentials and issues an access token.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthenticatedUser, CoreError> {
        request.validate()?;

        let user = self
            .users
            .find_by_email(&request.email)
            .await?
            .ok_or(CoreError::Unauthorized)?;

        if !self.passwords.verify(&request.password, &user.password_hash)? {
            return Err(CoreError::Unauthorized);
        }

        let (access_token, token_expires_at) = self.jwt.issue_access_token(user.id)?;
        Ok(AuthenticatedUser {
            user_id: user.id,
            email: user.email,
            full_name: user.full_name,
            access_token,
            token_expires_at,
        })
    }

    /// Confirms an email address from a verification token.
    pub async fn verify_email(&self, token: &str) -> Result<User, CoreError> {
        let now = self.clock.now();
        let user = self
            .users
            .verify_email(token, now)
            .await?
            .ok_or(CoreError::NotFound("verification token"))?;
        Ok(user.into())
    }

    /// Issues a password reset token if the email belongs to a live account.
    ///
    /// Always returns Ok so callers cannot probe which addresses exist.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), CoreError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            return Ok(());
        };

        let now = self.clock.now();
        let token = self.tokens.account_token();
        let token_expiry = now + Duration::hours(self.account_token_expiry_hours);
        self.users
            .set_password_reset_token(user.id, &token, token_expiry, now)
            .await?;

        self.notifier.send_password_reset(&user.email, &token).await;
        Ok(())
    }

    /// Replaces the password from a single-use reset token.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<User, CoreError> {
        if new_password.len() < 8 || new_password.len() > 128 {
            return Err(CoreError::Validation(
                "password must be between 8 and 128 characters".to_string(),
            ));
        }

        let now = self.clock.now();
        let new_hash = self.passwords.hash(new_password)?;
        let user = self
            .users
            .reset_password(token, &new_hash, now)
            .await?
            .ok_or(CoreError::NotFound("reset token"))?;
        Ok(user.into())
    }

    /// Tombstones the caller's account.
    pub async fn delete_account(&self, user_id: Uuid) -> Result<(), CoreError> {
        let now = self.clock.now();
        if !self.users.soft_delete(user_id, Some(user_id), now).await? {
            return Err(CoreError::NotFound("user"));
        }
        Ok(())
    }
}
