//! JWT service for access token generation and validation
//!
//! Access tokens are HS256-signed and carry the user's id, username and role,
//! so that request authentication does not need a database round trip.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AuthError, AuthResult};
use crate::models::{Role, User};

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared secret used to sign and verify tokens
    pub secret: String,
    /// Access token expiration time in seconds (default: 1 day)
    pub access_token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: Secret used for HS256 signing (required)
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 86400)
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        if secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "86400".to_string()) // 1 day
            .parse()
            .unwrap_or(86400);

        Ok(JwtConfig {
            secret,
            access_token_expiry,
        })
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: i64,
    /// Username at issue time
    pub username: String,
    /// Role at issue time
    pub role: Role,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        }
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user: &User) -> AuthResult<String> {
        let now = now_secs()?;

        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            iat: now,
            exp: now + self.config.access_token_expiry,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> AuthResult<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}

fn now_secs() -> AuthResult<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| AuthError::Internal(format!("Failed to get current time: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            access_token_expiry: 900,
        }
    }

    fn test_user(role: Role) -> User {
        User {
            id: 7,
            username: "critic".to_string(),
            email: "critic@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            role,
            confirmation_code_hash: None,
            confirmation_code_expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_generate_and_validate_access_token() {
        let service = JwtService::new(test_config("test-secret-that-is-long-enough"));
        let token = service
            .generate_access_token(&test_user(Role::Moderator))
            .unwrap();

        let claims = service.validate_token(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username, "critic");
        assert_eq!(claims.role, Role::Moderator);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_expired_token_fails() {
        let service = JwtService::new(test_config("test-secret-that-is-long-enough"));
        let now = now_secs().unwrap();
        let claims = Claims {
            sub: 1,
            username: "late".to_string(),
            role: Role::User,
            iat: now - 600,
            exp: now - 300, // past the default 60s leeway
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret-that-is-long-enough"),
        )
        .unwrap();

        assert!(service.validate_token(&token).is_err());
    }

    #[test]
    fn test_different_secrets_fail() {
        let issuer = JwtService::new(test_config("secret-alpha"));
        let verifier = JwtService::new(test_config("secret-bravo"));
        let token = issuer.generate_access_token(&test_user(Role::User)).unwrap();

        assert!(verifier.validate_token(&token).is_err());
        assert!(verifier.validate_token("not-a-jwt").is_err());
    }
}
