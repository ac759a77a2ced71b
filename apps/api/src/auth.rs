//! Sign-in tokens
//!
//! HS256 JWTs carrying the user's email, returned by `signup` and `login`.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{ApiError, ApiResult};

/// Issuer written into every token
pub const TOKEN_ISSUER: &str = "repohero";

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User's email
    pub email: String,

    /// Issued at timestamp (Unix epoch)
    pub iat: i64,

    /// Expiration timestamp (Unix epoch)
    pub exp: i64,

    /// Issuer
    pub iss: String,
}

/// Signs and verifies tokens with a shared secret
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    expiry_hours: i64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("expiry_hours", &self.expiry_hours)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, expiry_hours: i64) -> Self {
        Self {
            secret: secret.into(),
            expiry_hours,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.jwt_secret.clone(), config.jwt_expiry_hours)
    }

    /// Issue a token for `email`
    pub fn issue(&self, email: &str) -> ApiResult<String> {
        let now = Utc::now();
        let claims = Claims {
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.expiry_hours)).timestamp(),
            iss: TOKEN_ISSUER.to_string(),
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }

    /// Verify a token and return its claims
    ///
    /// # Errors
    /// - `ApiError::InvalidToken` if the token is expired, malformed or
    ///   signed with a different secret
    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[TOKEN_ISSUER]);

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!(error = %e, "Token verification failed");
            ApiError::InvalidToken(e.to_string())
        })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SECRET: &str = "test-secret-that-is-at-least-32-characters";

    #[test]
    fn test_issue_and_verify() {
        let issuer = TokenIssuer::new(SECRET, 24);
        let token = issuer.issue("ada@example.com").unwrap();

        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = TokenIssuer::new(SECRET, 24).issue("ada@example.com").unwrap();
        let other = TokenIssuer::new("another-secret-that-is-long-enough!!", 24);
        assert_matches!(other.verify(&token), Err(ApiError::InvalidToken(_)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = TokenIssuer::new(SECRET, -2);
        let token = issuer.issue("ada@example.com").unwrap();
        assert_matches!(issuer.verify(&token), Err(ApiError::InvalidToken(_)));
    }

    #[test]
    fn test_garbage_rejected() {
        let issuer = TokenIssuer::new(SECRET, 24);
        assert_matches!(issuer.verify("not.a.jwt"), Err(ApiError::InvalidToken(_)));
    }

    #[test]
    fn test_debug_hides_secret() {
        let issuer = TokenIssuer::new(SECRET, 24);
        assert!(!format!("{:?}", issuer).contains(SECRET));
    }
}
