//! Manage json web tokens.

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    get_current_timestamp,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};
use crate::model::UserId;

pub const DEFAULT_AUDIENCE: &str = "gpm";
/// Token lifetime, in seconds.
pub const EXPIRATION_TIME: u64 = 60 * 60 * 24;

/// Pieces of information asserted on a JWT.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Claims {
    /// Recipients that the JWT is intended for.
    pub aud: String,
    /// Expiration time, in seconds since the epoch.
    pub exp: u64,
    /// Issue time, in seconds since the epoch.
    pub iat: u64,
    /// Identifies the instance that issued the JWT.
    pub iss: String,
    /// User ID.
    pub sub: String,
}

/// Sign and check HS256 tokens.
#[derive(Clone)]
pub struct TokenManager {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    name: String,
    audience: String,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("algorithm", &self.algorithm)
            .field("name", &self.name)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Create a new [`TokenManager`] instance.
    pub fn new(name: &str, secret: &str) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            name: name.to_owned(),
            audience: DEFAULT_AUDIENCE.to_owned(),
        }
    }

    /// Set `audience` field on JWT.
    pub fn audience(&mut self, audience: &str) {
        self.audience = audience.to_owned();
    }

    /// Create a new token for `user_id`.
    pub fn create(&self, user_id: UserId) -> Result<String> {
        let time = get_current_timestamp();
        let claims = Claims {
            aud: self.audience.clone(),
            exp: time + EXPIRATION_TIME,
            iat: time,
            iss: self.name.clone(),
            sub: user_id.to_string(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|err| ServerError::internal("cannot sign token", err))
    }

    /// Decode and check a token.
    pub fn decode(&self, token: &str) -> jsonwebtoken::errors::Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.name]);

        Ok(decode::<Claims>(token, &self.decoding_key, &validation)?.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_then_decode() {
        let manager = TokenManager::new("https://gpm.example.com/", "secret");
        let token = manager.create(42).unwrap();

        let claims = manager.decode(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.aud, DEFAULT_AUDIENCE);
        assert_eq!(claims.exp - claims.iat, EXPIRATION_TIME);
    }

    #[test]
    fn test_reject_foreign_tokens() {
        let manager = TokenManager::new("gpm", "secret");
        let token = manager.create(1).unwrap();

        let other = TokenManager::new("gpm", "another secret");
        assert!(other.decode(&token).is_err());

        let mut audience = TokenManager::new("gpm", "secret");
        audience.audience("elsewhere");
        assert!(audience.decode(&token).is_err());

        assert!(manager.decode("not.a.token").is_err());
    }
}
