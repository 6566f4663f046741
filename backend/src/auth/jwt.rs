//! JWT token generation and validation
//!
//! Access tokens are HS256 JWTs carrying the member id, e-mail and role.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::Member;

/// JWT-related errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum JwtError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// JWT claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (member ID)
    pub sub: String,
    pub email: String,
    /// Member role at issue time; the stored role is authoritative
    pub role: String,
    /// JWT ID (for revocation)
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn member_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|e| JwtError::InvalidToken(e.to_string()))
    }
}

/// Generate an access token for a member
///
/// # Arguments
/// * `member` - The authenticated member
/// * `jti` - Unique token identifier for revocation
/// * `secret` - JWT signing secret
/// * `ttl_seconds` - Token time-to-live in seconds
pub fn generate_access_token(
    member: &Member,
    jti: &str,
    secret: &str,
    ttl_seconds: i64,
) -> Result<String, JwtError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(ttl_seconds);

    let claims = Claims {
        sub: member.id.to_string(),
        email: member.email.clone(),
        role: member.role.as_str().to_string(),
        jti: jti.to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::EncodingFailed(e.to_string()))
}

/// Verify and decode a JWT token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::TokenExpired,
        _ => JwtError::InvalidToken(e.to_string()),
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemberRole;

    fn create_test_member() -> Member {
        Member {
            id: Uuid::new_v4(),
            name: "Dossou".to_string(),
            first_name: "Mawu".to_string(),
            email: "mawu@example.com".to_string(),
            password_hash: String::new(),
            role: MemberRole::Secretary,
            npi: "1122334455".to_string(),
            phone: "+22961000000".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_generate_and_verify_access_token() {
        let member = create_test_member();
        let jti = Uuid::new_v4().to_string();
        let secret = "test-secret-key";

        let token = generate_access_token(&member, &jti, secret, 900).unwrap();
        let claims = verify_token(&token, secret).unwrap();

        assert_eq!(claims.member_id().unwrap(), member.id);
        assert_eq!(claims.email, member.email);
        assert_eq!(claims.role, "SECRETARY");
        assert_eq!(claims.jti, jti);
    }

    #[test]
    fn test_expired_token() {
        let member = create_test_member();
        let token = generate_access_token(&member, "jti", "secret", -120).unwrap();
        assert_eq!(verify_token(&token, "secret").unwrap_err(), JwtError::TokenExpired);
    }

    #[test]
    fn test_invalid_token() {
        let result = verify_token("invalid.token.here", "test-secret-key");
        assert!(matches!(result, Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn test_wrong_secret() {
        let member = create_test_member();
        let token = generate_access_token(&member, "jti", "secret1", 900).unwrap();
        assert!(verify_token(&token, "secret2").is_err());
    }
}
