//! JWT token handling
//!
//! Tokens carry the user's email as subject and are signed with HS256
//! (HMAC-SHA256). Default expiry is one hour.

use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::HortaError;

/// Minimum accepted secret length
const MIN_SECRET_LEN: usize = 32;

/// Payload stored in JWT token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's email
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// JWT validator and generator
#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
    expiry_seconds: u64,
}

impl JwtValidator {
    /// Create a new JWT validator
    ///
    /// Returns an error if the secret is empty or too short
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, HortaError> {
        if secret.is_empty() {
            return Err(HortaError::Config("JWT_SECRET is required".into()));
        }

        if secret.len() < MIN_SECRET_LEN {
            return Err(HortaError::Config(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }

        Ok(Self {
            secret,
            expiry_seconds,
        })
    }

    /// Token lifetime in seconds
    pub fn expiry_seconds(&self) -> u64 {
        self.expiry_seconds
    }

    /// Generate a signed token for `subject`
    pub fn generate_token(&self, subject: &str) -> Result<String, HortaError> {
        let now = unix_now()?;
        let exp = now.checked_add(self.expiry_seconds).ok_or_else(|| {
            HortaError::Config(format!(
                "JWT expiry of {} seconds is out of range",
                self.expiry_seconds
            ))
        })?;

        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| HortaError::Auth(format!("Failed to generate token: {}", e)))
    }

    /// Verify signature and expiry, returning the decoded claims
    pub fn verify_token(&self, token: &str) -> Result<Claims, HortaError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|err| {
            let msg = match err.kind() {
                ErrorKind::ExpiredSignature => "Token expired",
                ErrorKind::InvalidSignature => "Invalid signature",
                _ => "Invalid token",
            };
            HortaError::Unauthorized(msg.to_string())
        })
    }
}

fn unix_now() -> Result<u64, HortaError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| HortaError::Auth(format!("System time error: {}", e)))
}

/// Extract token from Authorization header.
/// Supports "Bearer <token>" format and raw tokens.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    if !header.contains(' ') {
        let token = header.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-at-least-32-characters-long";

    fn test_validator() -> JwtValidator {
        JwtValidator::new(SECRET.into(), 3600).unwrap()
    }

    #[test]
    fn test_generate_and_verify_token() {
        let validator = test_validator();

        let token = validator.generate_token("ana@x.com").unwrap();
        let claims = validator.verify_token(&token).unwrap();

        assert_eq!(claims.sub, "ana@x.com");
        assert_eq!(claims.exp - claims.iat, 60 * 60);
    }

    #[test]
    fn test_expiry_overflow_is_an_error() {
        let validator = JwtValidator::new(SECRET.into(), u64::MAX).unwrap();
        let err = validator.generate_token("ana@x.com").unwrap_err();
        assert!(matches!(err, HortaError::Config(_)));
    }

    #[test]
    fn test_invalid_token() {
        let err = test_validator().verify_token("invalid-token").unwrap_err();
        assert!(matches!(err, HortaError::Unauthorized(_)));
    }

    #[test]
    fn test_wrong_secret() {
        let other =
            JwtValidator::new("different-secret-that-is-at-least-32-characters".into(), 3600)
                .unwrap();

        let token = test_validator().generate_token("ana@x.com").unwrap();
        let err = other.verify_token(&token).unwrap_err();
        assert_eq!(err.detail(), "Invalid signature");
    }

    #[test]
    fn test_expired_token() {
        let claims = Claims {
            sub: "ana@x.com".into(),
            iat: 1_000,
            exp: 2_000,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let err = test_validator().verify_token(&token).unwrap_err();
        assert_eq!(err.detail(), "Token expired");
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc123")),
            Some("abc123")
        );
        assert_eq!(extract_token_from_header(Some("abc123")), Some("abc123"));

        assert_eq!(extract_token_from_header(None), None);
        assert_eq!(extract_token_from_header(Some("")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(Some("Basic abc123")), None);
    }

    #[test]
    fn test_secret_validation() {
        assert!(JwtValidator::new("short".into(), 3600).is_err());
        assert!(JwtValidator::new("".into(), 3600).is_err());
        assert!(JwtValidator::new(SECRET.into(), 3600).is_ok());
    }
}
