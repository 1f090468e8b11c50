//! Error taxonomy for the command surface.
//!
//! Every variant except `Internal` is an expected, typed outcome. Version
//! conflicts always carry the authoritative current item so a client can
//! rebase; the core never auto-merges or retries on the caller's behalf.

use domain::models::{InvitationStatus, ShoppingItem};
use shared::jwt::JwtError;
use shared::password::PasswordError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(&'static str),

    #[error("Permission denied: {0}")]
    PermissionDenied(&'static str),

    #[error("Version conflict (current version {})", current.version)]
    Conflict { current: Box<ShoppingItem> },

    #[error("Duplicate: {0}")]
    Duplicate(&'static str),

    #[error("Invitation has expired")]
    Expired,

    #[error("Invitation already {0}")]
    AlreadyResolved(InvitationStatus),

    #[error("Group is at its member capacity ({max_members})")]
    Capacity { max_members: i32 },

    #[error("Invalid credentials")]
    Unauthorized,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => CoreError::NotFound("resource"),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                CoreError::Duplicate("resource already exists")
            }
            other => CoreError::Internal(format!("database error: {}", other)),
        }
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let rendered: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    let message = e
                        .message
                        .clone()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "invalid value".to_string());
                    format!("{}: {}", field, message)
                })
            })
            .collect();
        CoreError::Validation(rendered.join("; "))
    }
}

impl From<PasswordError> for CoreError {
    fn from(err: PasswordError) -> Self {
        CoreError::Internal(format!("password hashing error: {}", err))
    }
}

impl From<JwtError> for CoreError {
    fn from(err: JwtError) -> Self {
        CoreError::Internal(format!("token error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 1, message = "Name must not be empty"))]
        name: String,
    }

    #[test]
    fn test_validation_errors_render_field_and_message() {
        let probe = Probe {
            name: String::new(),
        };
        let err: CoreError = probe.validate().unwrap_err().into();
        match err {
            CoreError::Validation(msg) => {
                assert!(msg.contains("name"));
                assert!(msg.contains("Name must not be empty"));
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: CoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
