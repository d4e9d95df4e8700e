//! JWT Token Handler
//! Mission: Generate and validate session tokens securely

use crate::auth::models::{Account, Claims};
use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;
use uuid::Uuid;

/// JWT Handler for token operations
pub struct JwtHandler {
    secret: String,
    expiration_hours: i64,
}

impl JwtHandler {
    /// Create a new JWT handler with secret key
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            expiration_hours: 24, // 24-hour tokens by default
        }
    }

    /// Generate a token binding an account to a session id.
    ///
    /// The token carries no role: the middleware re-resolves it from the
    /// account on every request.
    pub fn generate_token(&self, account: &Account, session_id: &Uuid) -> Result<(String, usize)> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(chrono::Duration::hours(self.expiration_hours))
            .context("Invalid timestamp")?
            .timestamp() as usize;

        let expires_in = (self.expiration_hours * 3600) as usize;

        let claims = Claims {
            sub: account.id.to_string(),
            sid: session_id.to_string(),
            username: account.username.clone(),
            exp: expiration,
        };

        debug!(
            "Generating JWT for account {} ({}), expires in {}h",
            account.username, account.id, self.expiration_hours
        );

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to generate JWT")?;

        Ok((token, expires_in))
    }

    /// Validate a token and extract claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .context("Invalid or expired token")?;

        debug!("Validated JWT for account {}", decoded.claims.username);

        Ok(decoded.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_account() -> Account {
        Account {
            id: Uuid::new_v4(),
            username: "jane".to_string(),
            name: "Jane Doe".to_string(),
            email: "jane@clinic.com".to_string(),
            password_hash: "hash".to_string(),
            specialization: "Doctor".to_string(),
            is_staff: true,
            is_superuser: false,
            is_active: true,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn test_jwt_generation_and_validation() {
        let handler = JwtHandler::new("test-secret-key-12345".to_string());
        let account = create_test_account();
        let session_id = Uuid::new_v4();

        let (token, expires_in) = handler.generate_token(&account, &session_id).unwrap();
        assert!(!token.is_empty());
        assert_eq!(expires_in, 24 * 3600); // 24 hours in seconds

        let claims = handler.validate_token(&token).unwrap();
        assert_eq!(claims.username, account.username);
        assert_eq!(claims.sub, account.id.to_string());
        assert_eq!(claims.sid, session_id.to_string());
        assert!(claims.exp > Utc::now().timestamp() as usize);
    }

    #[test]
    fn test_invalid_token_rejected() {
        let handler = JwtHandler::new("test-secret-key-12345".to_string());

        let result = handler.validate_token("invalid.token.here");
        assert!(result.is_err());
    }

    #[test]
    fn test_different_secrets_reject() {
        let handler1 = JwtHandler::new("secret1".to_string());
        let handler2 = JwtHandler::new("secret2".to_string());
        let account = create_test_account();

        let (token, _) = handler1.generate_token(&account, &Uuid::new_v4()).unwrap();

        let result = handler2.validate_token(&token);
        assert!(result.is_err());
    }
}
