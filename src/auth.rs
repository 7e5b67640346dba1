// ABOUTME: Token verification primitives for tenant resolution
// ABOUTME: Bearer JWT validation and API key hashing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Marker prefix identifying Monay API keys in headers and bearer tokens
pub const API_KEY_PREFIX: &str = "mk_";

/// Claims carried by a Monay bearer JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id as a UUID string
    pub sub: String,
    /// Email, when the issuer included one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Issued-at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

/// Verifies bearer JWTs against the shared HMAC secret
///
/// Verification failures are soft from the caller's perspective: the
/// credential extractor treats them as "no match" and moves on to the next
/// resolution source.
#[derive(Clone)]
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthManager {
    /// Build a manager around the shared HMAC secret
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Verify a bearer token and return its claims
    ///
    /// # Errors
    ///
    /// Returns an authentication error when the token is malformed, expired,
    /// or carries an invalid signature.
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::auth_required(format!("Invalid bearer token: {e}")))
    }

    /// Issue a token for a user, expiring after `lifetime`
    ///
    /// The gateway itself never issues tokens for external callers; this
    /// exists for service tooling and test setup.
    ///
    /// # Errors
    ///
    /// Returns an internal error when signing fails.
    pub fn generate_token(&self, user_id: Uuid, lifetime: Duration) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email: None,
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }
}

/// Hash an API key for storage and lookup
///
/// Keys are stored and matched by SHA-256 digest only; the plaintext key is
/// returned to the tenant exactly once at provisioning time.
#[must_use]
pub fn hash_api_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn valid_token_round_trips() {
        let manager = AuthManager::new("test-secret");
        let user_id = Uuid::new_v4();
        let token = manager.generate_token(user_id, Duration::hours(1)).unwrap();

        let claims = manager.validate_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
    }

    #[test]
    fn expired_token_is_rejected() {
        let manager = AuthManager::new("test-secret");
        let token = manager
            .generate_token(Uuid::new_v4(), Duration::hours(-2))
            .unwrap();

        assert!(manager.validate_token(&token).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issuer = AuthManager::new("secret-a");
        let verifier = AuthManager::new("secret-b");
        let token = issuer
            .generate_token(Uuid::new_v4(), Duration::hours(1))
            .unwrap();

        assert!(verifier.validate_token(&token).is_err());
    }

    #[test]
    fn api_key_hash_is_stable() {
        assert_eq!(hash_api_key("mk_abc123"), hash_api_key("mk_abc123"));
        assert_ne!(hash_api_key("mk_abc123"), hash_api_key("mk_abc124"));
    }
}
