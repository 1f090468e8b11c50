//! External capabilities consumed by the services.
//!
//! The services never reach for wall-clock time, randomness, or delivery
//! channels directly; they go through these traits so tests can substitute
//! deterministic implementations.

use chrono::{DateTime, Utc};
use shared::password::{hash_password, verify_password, PasswordError};
use shared::token;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Generator for opaque tokens and invite codes.
pub trait TokenIssuer: Send + Sync {
    /// Long unguessable per-invitation token.
    fn invitation_token(&self) -> String;
    /// Short shareable group invite code.
    fn invite_code(&self) -> String;
    /// Email verification / password reset token.
    fn account_token(&self) -> String;
}

/// Random tokens from the shared unambiguous charset.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueTokenIssuer;

impl TokenIssuer for OpaqueTokenIssuer {
    fn invitation_token(&self) -> String {
        token::generate_invitation_token()
    }

    fn invite_code(&self) -> String {
        token::generate_invite_code()
    }

    fn account_token(&self) -> String {
        token::generate_account_token()
    }
}

/// Password hashing and verification.
pub trait PasswordVerifier: Send + Sync {
    fn hash(&self, plain: &str) -> Result<String, PasswordError>;
    fn verify(&self, plain: &str, hash: &str) -> Result<bool, PasswordError>;
}

/// Argon2id via the shared crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgonPasswordVerifier;

impl PasswordVerifier for ArgonPasswordVerifier {
    fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        hash_password(plain)
    }

    fn verify(&self, plain: &str, hash: &str) -> Result<bool, PasswordError> {
        verify_password(plain, hash)
    }
}

/// Outbound notification channel.
///
/// Delivery is fire-and-forget from the command's point of view: a failing
/// notifier must never fail the command that triggered it, so the trait has
/// no error to return.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send_invitation(&self, email: &str, token: &str);
    async fn send_verification(&self, email: &str, token: &str);
    async fn send_password_reset(&self, email: &str, token: &str);
}

/// Logs outbound notifications instead of delivering them.
///
/// Default wiring until a real mail provider is configured; tokens are not
/// logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait::async_trait]
impl Notifier for LoggingNotifier {
    async fn send_invitation(&self, email: &str, _token: &str) {
        tracing::info!(email, "invitation notification (logging notifier)");
    }

    async fn send_verification(&self, email: &str, _token: &str) {
        tracing::info!(email, "verification notification (logging notifier)");
    }

    async fn send_password_reset(&self, email: &str, _token: &str) {
        tracing::info!(email, "password reset notification (logging notifier)");
    }
}

#[cfg(test)]
pub mod test_support {
    //! Deterministic capability implementations for service tests.

    use super::*;

    /// A clock pinned to a fixed instant.
    pub struct FixedClock(pub DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::token::{INVITATION_TOKEN_LEN, INVITE_CODE_LEN};

    #[test]
    fn test_opaque_issuer_token_shapes() {
        let issuer = OpaqueTokenIssuer;
        assert_eq!(issuer.invitation_token().len(), INVITATION_TOKEN_LEN);
        assert_eq!(issuer.invite_code().len(), INVITE_CODE_LEN);
        assert_eq!(issuer.account_token().len(), INVITATION_TOKEN_LEN);
    }

    #[test]
    fn test_argon_verifier_round_trip() {
        let verifier = ArgonPasswordVerifier;
        let hash = verifier.hash("hunter2hunter2").unwrap();
        assert!(verifier.verify("hunter2hunter2", &hash).unwrap());
        assert!(!verifier.verify("wrong", &hash).unwrap());
    }

    #[test]
    fn test_fixed_clock_is_deterministic() {
        let instant = Utc::now();
        let clock = test_support::FixedClock(instant);
        assert_eq!(clock.now(), instant);
        assert_eq!(clock.now(), instant);
    }
}
