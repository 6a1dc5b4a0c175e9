//! Payload validation
//!
//! Shared between the client (checked before a request is sent, so form
//! errors render without a round trip) and the server handlers (re-checked
//! on arrival). Checks are shape and length only; uniqueness is the
//! database's job.

use crate::types::{ForgeError, Result};

pub const PASSWORD_MIN_LEN: usize = 8;
pub const TITLE_MAX_LEN: usize = 200;
pub const USERNAME_MAX_LEN: usize = 64;

/// Minimal email shape check: one `@` with a dotted domain after it.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}

/// Validate login form fields.
pub fn login(identifier: &str, password: &str) -> Result<()> {
    if identifier.trim().is_empty() {
        return Err(ForgeError::Validation("Email is required".into()));
    }
    if password.is_empty() {
        return Err(ForgeError::Validation("Password is required".into()));
    }
    Ok(())
}

/// Validate registration fields.
pub fn registration(username: &str, email: &str, password: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(ForgeError::Validation("Username is required".into()));
    }
    if username.len() > USERNAME_MAX_LEN {
        return Err(ForgeError::Validation(format!(
            "Username must be at most {} characters",
            USERNAME_MAX_LEN
        )));
    }
    if !is_valid_email(email) {
        return Err(ForgeError::Validation("A valid email is required".into()));
    }
    if password.len() < PASSWORD_MIN_LEN {
        return Err(ForgeError::Validation(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN_LEN
        )));
    }
    Ok(())
}

/// Validate a new challenge payload.
pub fn challenge(title: &str, description: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(ForgeError::Validation("Title is required".into()));
    }
    if title.len() > TITLE_MAX_LEN {
        return Err(ForgeError::Validation(format!(
            "Title must be at most {} characters",
            TITLE_MAX_LEN
        )));
    }
    if description.trim().is_empty() {
        return Err(ForgeError::Validation("Description is required".into()));
    }
    Ok(())
}

/// Validate a new response payload.
pub fn response(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(ForgeError::Validation("Content is required".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
        assert!(!is_valid_email("ada"));
        assert!(!is_valid_email("ada@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada@.com"));
        assert!(!is_valid_email("ada @example.com"));
    }

    #[test]
    fn registration_rejects_short_password() {
        let err = registration("ada", "ada@example.com", "short").unwrap_err();
        assert!(err.to_string().contains("at least 8"));
    }

    #[test]
    fn registration_accepts_sound_fields() {
        assert!(registration("ada", "ada@example.com", "longenough").is_ok());
    }

    #[test]
    fn challenge_title_bounds() {
        assert!(challenge("Reasonable title", "body").is_ok());
        assert!(challenge("", "body").is_err());
        assert!(challenge(&"x".repeat(TITLE_MAX_LEN + 1), "body").is_err());
        assert!(challenge("title", " ").is_err());
    }
}
