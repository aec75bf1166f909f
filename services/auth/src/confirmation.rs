//! Single-use confirmation codes sent by email during signup.
//!
//! Only an Argon2 hash of a code is stored, together with its expiry. A code
//! is consumed by clearing the stored hash, so a second exchange of the same
//! code finds nothing to verify against.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::error::{AuthError, AuthResult};

/// Number of digits in a confirmation code
pub const CODE_LENGTH: usize = 6;

/// Confirmation code configuration
#[derive(Debug, Clone)]
pub struct ConfirmationConfig {
    /// Lifetime of an issued code in seconds (default: 3 days)
    pub code_ttl_secs: i64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: 259_200,
        }
    }
}

impl ConfirmationConfig {
    /// Create a new ConfirmationConfig from environment variables
    ///
    /// # Environment Variables
    /// - `CONFIRMATION_CODE_TTL_SECS`: code lifetime in seconds (default: 259200)
    pub fn from_env() -> Self {
        let code_ttl_secs = std::env::var("CONFIRMATION_CODE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|ttl: &i64| *ttl > 0)
            .unwrap_or(259_200);

        Self { code_ttl_secs }
    }

    /// Expiry of a code issued at `now`
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::seconds(self.code_ttl_secs)
    }
}

/// A freshly issued code: the plaintext to mail and the hash to store
#[derive(Debug, Clone)]
pub struct IssuedCode {
    pub code: String,
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Generate a random numeric confirmation code and its hash
pub fn issue_code(config: &ConfirmationConfig, now: DateTime<Utc>) -> AuthResult<IssuedCode> {
    let code = generate_code();
    let hash = hash_code(&code)?;

    Ok(IssuedCode {
        code,
        hash,
        expires_at: config.expires_at(now),
    })
}

fn generate_code() -> String {
    let value: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:0width$}", value, width = CODE_LENGTH)
}

fn hash_code(code: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(code.as_bytes(), &salt)
        .map_err(|e| AuthError::Internal(format!("Failed to hash confirmation code: {}", e)))?
        .to_string();

    Ok(hash)
}

/// Check a submitted code against the stored hash and expiry.
///
/// A missing hash means no code was issued or it was already consumed.
pub fn verify_code(
    submitted: &str,
    stored_hash: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> AuthResult<()> {
    let stored_hash = stored_hash.ok_or(AuthError::InvalidConfirmationCode)?;

    if expires_at.is_some_and(|expiry| expiry <= now) {
        return Err(AuthError::InvalidConfirmationCode);
    }

    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AuthError::Internal(format!("Stored confirmation code is corrupt: {}", e)))?;

    Argon2::default()
        .verify_password(submitted.trim().as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidConfirmationCode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_numeric() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_issued_code_verifies_once_stored() {
        let now = Utc::now();
        let issued = issue_code(&ConfirmationConfig::default(), now).unwrap();

        assert!(issued.hash.starts_with("$argon2"));
        assert_ne!(issued.hash, issued.code);
        assert!(verify_code(&issued.code, Some(&issued.hash), Some(issued.expires_at), now).is_ok());
    }

    #[test]
    fn test_wrong_code_is_rejected() {
        let now = Utc::now();
        let issued = issue_code(&ConfirmationConfig::default(), now).unwrap();
        let wrong = if issued.code == "000000" { "000001" } else { "000000" };

        let result = verify_code(wrong, Some(&issued.hash), Some(issued.expires_at), now);
        assert!(matches!(result, Err(AuthError::InvalidConfirmationCode)));
    }

    #[test]
    fn test_consumed_code_is_rejected() {
        let now = Utc::now();
        let issued = issue_code(&ConfirmationConfig::default(), now).unwrap();

        // Consuming clears the stored hash
        let result = verify_code(&issued.code, None, None, now);
        assert!(matches!(result, Err(AuthError::InvalidConfirmationCode)));
    }

    #[test]
    fn test_expired_code_is_rejected() {
        let issued_at = Utc::now() - Duration::days(10);
        let config = ConfirmationConfig { code_ttl_secs: 60 };
        let issued = issue_code(&config, issued_at).unwrap();

        let result = verify_code(
            &issued.code,
            Some(&issued.hash),
            Some(issued.expires_at),
            Utc::now(),
        );
        assert!(matches!(result, Err(AuthError::InvalidConfirmationCode)));
    }

    #[test]
    fn test_expiry_follows_ttl() {
        let now = Utc::now();
        let config = ConfirmationConfig { code_ttl_secs: 3600 };
        assert_eq!(config.expires_at(now) - now, Duration::hours(1));
    }
}
