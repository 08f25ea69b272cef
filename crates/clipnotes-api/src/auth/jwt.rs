//! Bearer token verification.
//!
//! Tokens come from an external identity provider and are verified HS256
//! against a shared secret. The subject claim is the owner id applied to
//! every read and mutation.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use clipnotes_core::AppError;

/// Claims we require from the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the owner id as a UUID string.
    pub sub: String,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

/// Verify the token signature and extract the owner id from the subject
/// claim. Signature failures, expiry, and a malformed subject all yield
/// `Unauthorized`.
pub fn verify_token(token: &str, secret: &str) -> Result<Uuid, AppError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

    Uuid::parse_str(&data.claims.sub)
        .map_err(|_| AppError::Unauthorized("Token subject is not a valid owner id".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn make_token(sub: &str, exp_offset_secs: i64, secret: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp: chrono::Utc::now().timestamp() + exp_offset_secs,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_yields_owner_id() {
        let owner = Uuid::new_v4();
        let token = make_token(&owner.to_string(), 3600, SECRET);
        assert_eq!(verify_token(&token, SECRET).unwrap(), owner);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = make_token(&Uuid::new_v4().to_string(), 3600, SECRET);
        let err = verify_token(&token, "another-secret-another-secret-32").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = make_token(&Uuid::new_v4().to_string(), -3600, SECRET);
        assert!(matches!(
            verify_token(&token, SECRET),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_non_uuid_subject_rejected() {
        let token = make_token("alice@example.com", 3600, SECRET);
        assert!(matches!(
            verify_token(&token, SECRET),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(matches!(
            verify_token("not.a.jwt", SECRET),
            Err(AppError::Unauthorized(_))
        ));
    }
}
