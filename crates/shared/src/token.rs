//! Opaque token and invite code generation.
//!
//! Invitation tokens are long unguessable strings carried in invitation
//! links. Invite codes are short human-shareable codes printed on screen.
//! Both use a URL-safe charset that avoids confusing characters
//! (0, O, 1, l, I).

use rand::Rng;

const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789";

/// Length of a per-invitation token.
pub const INVITATION_TOKEN_LEN: usize = 32;

/// Length of a shareable group invite code.
pub const INVITE_CODE_LEN: usize = 8;

fn random_string(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Generate a secure invitation token.
pub fn generate_invitation_token() -> String {
    random_string(INVITATION_TOKEN_LEN)
}

/// Generate a short group invite code.
///
/// Codes are uppercased for easier reading aloud.
pub fn generate_invite_code() -> String {
    random_string(INVITE_CODE_LEN).to_uppercase()
}

/// Generate an email verification or password reset token.
pub fn generate_account_token() -> String {
    random_string(INVITATION_TOKEN_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invitation_token_length() {
        assert_eq!(generate_invitation_token().len(), INVITATION_TOKEN_LEN);
    }

    #[test]
    fn test_invitation_token_unique() {
        let a = generate_invitation_token();
        let b = generate_invitation_token();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invitation_token_charset() {
        let token = generate_invitation_token();
        assert!(!token.contains('0'));
        assert!(!token.contains('O'));
        assert!(!token.contains('1'));
        assert!(!token.contains('l'));
        assert!(!token.contains('I'));
    }

    #[test]
    fn test_invite_code_length_and_case() {
        let code = generate_invite_code();
        assert_eq!(code.len(), INVITE_CODE_LEN);
        assert_eq!(code, code.to_uppercase());
    }

    #[test]
    fn test_account_token_unique() {
        assert_ne!(generate_account_token(), generate_account_token());
    }
}
