//! Manage json web tokens.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

pub const DEFAULT_EXPIRATION_MINUTES: u64 = 60 * 24; // one day.

/// Pieces of information asserted on a JWT.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Identifies the expiration time on or after which the JWT must not be
    /// accepted for processing.
    pub exp: u64,
    /// Identifies the time at which the JWT was issued.
    pub iat: u64,
    /// Identifies the organization that issued the JWT.
    pub iss: String,
    /// User ID.
    pub sub: Uuid,
}

/// Manage JWT tokens.
#[derive(Clone)]
pub struct TokenManager {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    expiration_minutes: u64,
}

impl TokenManager {
    /// Create a new [`TokenManager`] instance.
    pub fn new(issuer: &str, secret: &str) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_owned(),
            expiration_minutes: DEFAULT_EXPIRATION_MINUTES,
        }
    }

    /// Set session lifetime in minutes.
    pub fn expiration(&mut self, minutes: u64) {
        self.expiration_minutes = minutes;
    }

    /// Create a new [`jsonwebtoken`].
    pub fn create(&self, user_id: Uuid) -> Result<String> {
        let time = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let header = Header::new(self.algorithm);
        let claims = Claims {
            exp: time + self.expiration_minutes * 60,
            iat: time,
            iss: self.issuer.clone(),
            sub: user_id,
        };

        Ok(encode(&header, &claims, &self.encoding_key)?)
    }

    /// Decode and check a token.
    pub fn decode(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_issuer(&[&self.issuer]);

        Ok(decode::<Claims>(token, &self.decoding_key, &validation)?.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> TokenManager {
        TokenManager::new("tasks.example.com", "an-hmac-secret-for-tests")
    }

    #[test]
    fn test_round_trip() {
        let manager = manager();
        let user_id = Uuid::new_v4();

        let token = manager.create(user_id).unwrap();
        let claims = manager.decode(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "tasks.example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = manager().create(Uuid::new_v4()).unwrap();

        let other = TokenManager::new("tasks.example.com", "another-secret");
        assert!(other.decode(&token).is_err());
    }

    #[test]
    fn test_wrong_issuer_is_rejected() {
        let token = manager().create(Uuid::new_v4()).unwrap();

        let other = TokenManager::new("evil.example.com", "an-hmac-secret-for-tests");
        assert!(other.decode(&token).is_err());
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let manager = manager();
        let mut token = manager.create(Uuid::new_v4()).unwrap();
        token.push('x');

        assert!(manager.decode(&token).is_err());
    }
}
