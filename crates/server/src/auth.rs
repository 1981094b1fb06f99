//! Password hashing (Argon2id) and bearer tokens (HS256 JWT).

use anyhow::anyhow;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use domain::Username;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::config::AuthSettings;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Canonical username.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys shared by all handlers.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &[u8], ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        if settings.jwt_secret.is_empty() {
            let mut bytes = [0u8; 32];
            OsRng.fill_bytes(&mut bytes);
            tracing::warn!(
                "auth.jwt_secret is not set, using a random secret; tokens will not survive a restart"
            );
            return Self::new(hex::encode(bytes).as_bytes(), settings.token_ttl_minutes);
        }
        Self::new(settings.jwt_secret.as_bytes(), settings.token_ttl_minutes)
    }

    pub fn issue(&self, user: &Username) -> anyhow::Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<Username, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))?;
        Ok(Username::new_unchecked(data.claims.sub))
    }
}

/// Argon2 is deliberately slow, so it runs on the blocking pool.
pub async fn hash_password(password: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| anyhow!("password hashing failed: {}", e))
    })
    .await?
}

pub async fn verify_password(password: String, password_hash: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&password_hash)
            .map_err(|e| anyhow!("invalid password hash format: {}", e))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(anyhow!("password verification failed: {}", e)),
        }
    })
    .await?
}
