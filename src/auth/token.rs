//! Bearer token issuing and verification.
//!
//! Tokens are HS256 JWTs carrying the user id (`sub`), username, issue time,
//! expiry and a unique `jti`. Expiry is checked here rather than by
//! `jsonwebtoken` so callers can supply the current time.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token verification and issuing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("missing bearer token")]
    Missing,
    #[error("malformed token")]
    Malformed,
    #[error("token has expired")]
    Expired,
    #[error("invalid token signature")]
    SignatureInvalid,
    #[error("failed to sign token: {0}")]
    Encoding(String),
}

/// Signed token payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub username: String,
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Expiry (seconds since epoch).
    pub exp: i64,
    /// Unique token id.
    pub jti: String,
}

/// A freshly issued token.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Issues and verifies tokens with a process-wide secret.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
        }
    }

    /// Issue a token for the given user, valid from now.
    pub fn issue(&self, user_id: &str, username: &str) -> Result<IssuedToken, TokenError> {
        self.issue_at(user_id, username, now_secs())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, user_id: &str, username: &str, now: i64) -> Result<IssuedToken, TokenError> {
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, now_secs())
    }

    /// Verify a token as if the current time were `now`.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
                _ => TokenError::Malformed,
            }
        })?;

        if data.claims.exp <= now {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_until_expiry() {
        let service = TokenService::new("test-secret", 3600);
        let issued = service.issue_at("user-1", "alice", 1_000).unwrap();
        assert_eq!(issued.expires_at, 4_600);

        let claims = service.verify_at(&issued.token, 1_000).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.username, "alice");

        assert_eq!(service.verify_at(&issued.token, 4_599).unwrap().sub, "user-1");
        assert_eq!(service.verify_at(&issued.token, 4_600), Err(TokenError::Expired));
        assert_eq!(service.verify_at(&issued.token, 9_999), Err(TokenError::Expired));
    }

    #[test]
    fn test_current_time_verification() {
        let service = TokenService::new("test-secret", 60);
        let issued = service.issue("user-2", "bob").unwrap();
        assert_eq!(service.verify(&issued.token).unwrap().sub, "user-2");
    }

    #[test]
    fn test_reissue_gives_distinct_tokens() {
        let service = TokenService::new("test-secret", 60);
        let a = service.issue_at("user-1", "alice", 1_000).unwrap();
        let b = service.issue_at("user-1", "alice", 1_000).unwrap();
        assert_ne!(a.token, b.token);
        assert!(service.verify_at(&a.token, 1_001).is_ok());
        assert!(service.verify_at(&b.token, 1_001).is_ok());
    }

    #[test]
    fn test_wrong_secret_is_signature_error() {
        let issuer = TokenService::new("secret-a", 60);
        let verifier = TokenService::new("secret-b", 60);
        let issued = issuer.issue("user-1", "alice").unwrap();
        assert_eq!(verifier.verify(&issued.token), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let service = TokenService::new("test-secret", 60);
        let issued = service.issue("user-1", "alice").unwrap();
        let forged = service.issue("user-2", "mallory").unwrap();

        // Splice the forged payload onto the original signature.
        let original: Vec<&str> = issued.token.split('.').collect();
        let other: Vec<&str> = forged.token.split('.').collect();
        let tampered = format!("{}.{}.{}", original[0], other[1], original[2]);

        assert_eq!(service.verify(&tampered), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let service = TokenService::new("test-secret", 60);
        assert_eq!(service.verify("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(service.verify(""), Err(TokenError::Malformed));
    }
}
