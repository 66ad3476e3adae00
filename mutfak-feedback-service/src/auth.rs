use argon2::password_hash::{rand_core::OsRng, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, PasswordHash};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{User, UserRole};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Cannot hash password")]
    Hash,
    #[error("Cannot issue token")]
    Issue,
    #[error("Invalid token")]
    InvalidToken,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String,
    pub role: UserRole,
    pub restaurant_id: Option<i32>,
    pub iat: usize,
    pub exp: usize,
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::Hash)
}

pub fn verify_password(password: &str, hashed: &str) -> bool {
    PasswordHash::new(hashed)
        .map(|hash| {
            Argon2::default()
                .verify_password(password.as_bytes(), &hash)
                .is_ok()
        })
        .unwrap_or(false)
}

pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    pub access_token_expires: TimeDelta,
}

impl TokenIssuer {
    pub fn new(secret_key: &str, access_token_expires: TimeDelta) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret_key.as_ref()),
            decoding_key: DecodingKey::from_secret(secret_key.as_ref()),
            access_token_expires,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.email.clone(),
            role: user.role,
            restaurant_id: user.restaurant_id,
            iat: now.timestamp() as usize,
            exp: (now + self.access_token_expires).timestamp() as usize,
        };
        jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claims, &self.encoding_key)
            .map_err(|_| AuthError::Issue)
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(
            token,
            &self.decoding_key,
            &jsonwebtoken::Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> User {
        User {
            id: 3,
            email: "owner@example.com".to_string(),
            hashed_password: String::new(),
            role: UserRole::RestaurantOwner,
            is_active: true,
            restaurant_id: Some(9),
        }
    }

    #[test]
    fn password_hash_matches_only_its_password() {
        let hashed = hash_password("s3cret").unwrap();
        assert!(verify_password("s3cret", &hashed));
        assert!(!verify_password("other", &hashed));
        assert!(!verify_password("s3cret", "not-a-phc-string"));
    }

    #[test]
    fn issued_token_carries_role_and_restaurant() {
        let issuer = TokenIssuer::new("test-secret", TimeDelta::minutes(30));
        let token = issuer.issue(&owner()).unwrap();
        let claims = issuer.decode(&token).unwrap();

        assert_eq!(claims.sub, "owner@example.com");
        assert_eq!(claims.role, UserRole::RestaurantOwner);
        assert_eq!(claims.restaurant_id, Some(9));
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn rejects_tokens_signed_with_another_key() {
        let issuer = TokenIssuer::new("test-secret", TimeDelta::minutes(30));
        let other = TokenIssuer::new("other-secret", TimeDelta::minutes(30));
        let token = other.issue(&owner()).unwrap();

        assert!(matches!(issuer.decode(&token), Err(AuthError::InvalidToken)));
        assert!(matches!(issuer.decode("garbage"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn rejects_expired_tokens() {
        let issuer = TokenIssuer::new("test-secret", TimeDelta::hours(-2));
        let token = issuer.issue(&owner()).unwrap();

        assert!(matches!(issuer.decode(&token), Err(AuthError::InvalidToken)));
    }
}
