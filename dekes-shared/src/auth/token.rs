/// Signed session tokens
///
/// Session tokens are HS256 JWTs issued by `"dekes"`. A valid signature is
/// necessary but not sufficient: the session manager also requires a live
/// row in the `sessions` table (see [`crate::auth::session`]).
///
/// # Example
///
/// ```
/// use dekes_shared::auth::token::{create_token, validate_token, SessionClaims};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "test-secret-key-at-least-32-bytes-long";
/// let claims = SessionClaims::new(Uuid::new_v4(), "a@x.com", Uuid::new_v4(), Duration::days(7));
/// let token = create_token(&claims, secret)?;
///
/// let validated = validate_token(&token, secret)?;
/// assert_eq!(validated.sub, claims.sub);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim for every session token
pub const TOKEN_ISSUER: &str = "dekes";

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature, issuer, or format check failed
    #[error("Failed to validate token: {0}")]
    ValidationError(String),
}

/// Session token claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject - user ID
    pub sub: Uuid,

    pub email: String,

    pub organization_id: Uuid,

    /// Issuer - always [`TOKEN_ISSUER`]
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Unique token ID; two sessions minted in the same second still differ
    pub jti: Uuid,
}

impl SessionClaims {
    /// Creates claims valid from now for `ttl`
    pub fn new(user_id: Uuid, email: &str, organization_id: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            email: email.to_string(),
            organization_id,
            iss: TOKEN_ISSUER.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4(),
        }
    }
}

/// Signs claims with HS256
pub fn create_token(claims: &SessionClaims, secret: &str) -> Result<String, TokenError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| TokenError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Verifies signature, issuer and `nbf`, and returns the claims
///
/// `exp` is not checked here. The session row's `expires_at` governs expiry,
/// and an expired token must still reach the row so it can be deleted.
pub fn validate_token(token: &str, secret: &str) -> Result<SessionClaims, TokenError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[TOKEN_ISSUER]);
    validation.validate_exp = false;
    validation.validate_nbf = true;

    let token_data = decode::<SessionClaims>(token, &key, &validation)
        .map_err(|e| TokenError::ValidationError(format!("Token validation failed: {}", e)))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn claims(ttl: Duration) -> SessionClaims {
        SessionClaims::new(Uuid::new_v4(), "a@x.com", Uuid::new_v4(), ttl)
    }

    #[test]
    fn test_claims_creation() {
        let user_id = Uuid::new_v4();
        let org_id = Uuid::new_v4();
        let claims = SessionClaims::new(user_id, "a@x.com", org_id, Duration::days(7));

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.organization_id, org_id);
        assert_eq!(claims.iss, "dekes");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
        assert_eq!(claims.nbf, claims.iat);
    }

    #[test]
    fn test_create_and_validate_token() {
        let claims = claims(Duration::days(7));
        let token = create_token(&claims, SECRET).expect("Should create token");

        let validated = validate_token(&token, SECRET).expect("Should validate token");
        assert_eq!(validated, claims);
    }

    #[test]
    fn test_tokens_are_unique() {
        let user_id = Uuid::new_v4();
        let org_id = Uuid::new_v4();
        let a = SessionClaims::new(user_id, "a@x.com", org_id, Duration::days(7));
        let b = SessionClaims::new(user_id, "a@x.com", org_id, Duration::days(7));

        assert_ne!(create_token(&a, SECRET).unwrap(), create_token(&b, SECRET).unwrap());
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let token = create_token(&claims(Duration::days(7)), SECRET).unwrap();

        assert!(matches!(
            validate_token(&token, "another-secret-key-at-least-32-bytes"),
            Err(TokenError::ValidationError(_))
        ));
    }

    #[test]
    fn test_expired_token_still_decodes() {
        let claims = claims(Duration::seconds(-3600));
        let token = create_token(&claims, SECRET).unwrap();

        let validated = validate_token(&token, SECRET).expect("Expiry is left to the session row");
        assert_eq!(validated.exp, claims.exp);
    }

    #[test]
    fn test_validate_wrong_issuer() {
        let mut claims = claims(Duration::days(7));
        claims.iss = "someone-else".to_string();
        let token = create_token(&claims, SECRET).unwrap();

        assert!(validate_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_validate_garbage() {
        assert!(validate_token("not-a-jwt", SECRET).is_err());
        assert!(validate_token("", SECRET).is_err());
    }
}
