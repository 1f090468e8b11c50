//! Invitation domain models and state machine.
//!
//! An invitation is `Pending` until it reaches one of the terminal states
//! `Accepted`, `Declined`, `Expired`, or `Revoked`. No transition leaves a
//! terminal state. Expiry is evaluated lazily at resolution time, never by a
//! background sweep.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::audit::{AuditInfo, Tombstone};

/// Policy default for invitation expiry.
pub const DEFAULT_INVITATION_EXPIRY_DAYS: i64 = 7;

/// Invitation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
    Revoked,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
            InvitationStatus::Expired => "expired",
            InvitationStatus::Revoked => "revoked",
        }
    }

    /// Every status except `Pending` is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvitationStatus::Pending)
    }
}

impl FromStr for InvitationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(InvitationStatus::Pending),
            "accepted" => Ok(InvitationStatus::Accepted),
            "declined" => Ok(InvitationStatus::Declined),
            "expired" => Ok(InvitationStatus::Expired),
            "revoked" => Ok(InvitationStatus::Revoked),
            _ => Err(format!("Invalid invitation status: {}", s)),
        }
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A pending offer of group membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Invitation {
    pub id: Uuid,
    pub group_id: Uuid,
    pub invited_email: String,
    pub invited_user_id: Option<Uuid>,
    pub invited_by: Uuid,
    pub status: InvitationStatus,
    #[serde(skip_serializing)]
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub message: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub audit: AuditInfo,
    #[serde(flatten)]
    pub tombstone: Tombstone,
}

/// Outcome of evaluating a stored invitation against a resolution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationResolution {
    /// Still pending and inside its expiry window; the transition may proceed.
    Resolvable,
    /// Pending but past `expires_at`; must be stored as `Expired` and the
    /// attempt rejected.
    LapsedPending,
    /// Already in a terminal state.
    AlreadyResolved(InvitationStatus),
}

impl Invitation {
    /// Evaluates lazy expiry for a resolution attempt at `now`.
    pub fn resolution(&self, now: DateTime<Utc>) -> InvitationResolution {
        if self.status.is_terminal() {
            return InvitationResolution::AlreadyResolved(self.status);
        }
        if now > self.expires_at {
            InvitationResolution::LapsedPending
        } else {
            InvitationResolution::Resolvable
        }
    }
}

/// Request payload for creating an invitation.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateInvitationRequest {
    #[validate(email(message = "Invalid email address"))]
    #[validate(length(max = 255, message = "Email must be at most 255 characters"))]
    pub invited_email: String,

    #[validate(length(max = 500, message = "Message must be at most 500 characters"))]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invitation(status: InvitationStatus, expires_at: DateTime<Utc>) -> Invitation {
        let now = Utc::now();
        Invitation {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            invited_email: "invitee@example.com".to_string(),
            invited_user_id: None,
            invited_by: Uuid::new_v4(),
            status,
            token: "tok".to_string(),
            expires_at,
            message: None,
            responded_at: None,
            audit: AuditInfo::on_insert(now, None),
            tombstone: Tombstone::live(),
        }
    }

    #[test]
    fn test_pending_within_window_is_resolvable() {
        let inv = invitation(InvitationStatus::Pending, Utc::now() + Duration::days(7));
        assert_eq!(inv.resolution(Utc::now()), InvitationResolution::Resolvable);
    }

    #[test]
    fn test_pending_past_expiry_lapses() {
        let inv = invitation(InvitationStatus::Pending, Utc::now() - Duration::hours(1));
        assert_eq!(
            inv.resolution(Utc::now()),
            InvitationResolution::LapsedPending
        );
    }

    #[test]
    fn test_terminal_states_stay_terminal() {
        for status in [
            InvitationStatus::Accepted,
            InvitationStatus::Declined,
            InvitationStatus::Expired,
            InvitationStatus::Revoked,
        ] {
            let inv = invitation(status, Utc::now() + Duration::days(7));
            assert_eq!(
                inv.resolution(Utc::now()),
                InvitationResolution::AlreadyResolved(status)
            );
            assert!(status.is_terminal());
        }
    }

    #[test]
    fn test_expiry_checked_even_when_terminal() {
        // A terminal invitation past its expiry still reports AlreadyResolved,
        // not LapsedPending.
        let inv = invitation(InvitationStatus::Declined, Utc::now() - Duration::days(1));
        assert_eq!(
            inv.resolution(Utc::now()),
            InvitationResolution::AlreadyResolved(InvitationStatus::Declined)
        );
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            InvitationStatus::Pending,
            InvitationStatus::Accepted,
            InvitationStatus::Declined,
            InvitationStatus::Expired,
            InvitationStatus::Revoked,
        ] {
            assert_eq!(
                status.as_str().parse::<InvitationStatus>().unwrap(),
                status
            );
        }
    }

    #[test]
    fn test_create_invitation_request_validation() {
        let valid = CreateInvitationRequest {
            invited_email: "test@example.com".to_string(),
            message: Some("Join us!".to_string()),
        };
        assert!(valid.validate().is_ok());

        let invalid = CreateInvitationRequest {
            invited_email: "not-an-email".to_string(),
            message: None,
        };
        assert!(invalid.validate().is_err());
    }
}
