//! JWT token generation and validation
//!
//! HS256 tokens carrying the user id and identifier. The validator is cheap
//! to construct; handlers build one from the configured secret per request.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::ForgeError;

/// Claims carried by a SkillForge token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id (subject)
    pub sub: i64,
    /// Login identifier (email)
    pub identifier: String,
    /// Issued-at, seconds since epoch
    pub iat: u64,
    /// Expiry, seconds since epoch
    pub exp: u64,
}

/// Outcome of verifying a token
#[derive(Debug)]
pub struct TokenValidationResult {
    pub valid: bool,
    pub claims: Option<Claims>,
    pub error: Option<String>,
}

/// Generates and verifies HS256 tokens
#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
    expiry_seconds: u64,
}

impl JwtValidator {
    pub fn new(secret: String, expiry_seconds: u64) -> Self {
        Self {
            secret,
            expiry_seconds,
        }
    }

    /// Generate a token for a user. Returns the token and its expiry timestamp.
    pub fn generate_token(&self, user_id: i64, identifier: &str) -> Result<(String, u64), ForgeError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ForgeError::Auth(format!("System clock error: {e}")))?
            .as_secs();
        let expires_at = now + self.expiry_seconds;

        let claims = Claims {
            sub: user_id,
            identifier: identifier.to_string(),
            iat: now,
            exp: expires_at,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ForgeError::Auth(format!("Failed to sign token: {e}")))?;

        Ok((token, expires_at))
    }

    /// Verify a token and extract its claims.
    pub fn verify_token(&self, token: &str) -> TokenValidationResult {
        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(data) => TokenValidationResult {
                valid: true,
                claims: Some(data.claims),
                error: None,
            },
            Err(e) => TokenValidationResult {
                valid: false,
                claims: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Extract a bearer token from an Authorization header value.
pub fn extract_token_from_header(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_verify() {
        let jwt = JwtValidator::new("test-secret".into(), 3600);
        let (token, expires_at) = jwt.generate_token(42, "ada@example.com").unwrap();

        let result = jwt.verify_token(&token);
        assert!(result.valid);
        let claims = result.claims.unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.identifier, "ada@example.com");
        assert_eq!(claims.exp, expires_at);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let jwt = JwtValidator::new("secret-a".into(), 3600);
        let (token, _) = jwt.generate_token(1, "a@b.c").unwrap();

        let other = JwtValidator::new("secret-b".into(), 3600);
        let result = other.verify_token(&token);
        assert!(!result.valid);
        assert!(result.claims.is_none());
        assert!(result.error.is_some());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let jwt = JwtValidator::new("test-secret".into(), 3600);
        assert!(!jwt.verify_token("not-a-token").valid);
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token_from_header(Some("Bearer abc123")), Some("abc123"));
        assert_eq!(extract_token_from_header(Some("Basic abc123")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(None), None);
    }
}
