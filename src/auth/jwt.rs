//! # Access Tokens
//!
//! HMAC-SHA256 signed access tokens (spec.md §4.8). Claims carry `sub`
//! (admin id), `email`, `iat`, `exp = iat + 15m`, and `iss = "mithril-cms"`.
//! Validation explicitly pins the algorithm family to HMAC so a token
//! signed (or forged) with `alg: none` or an asymmetric algorithm is
//! rejected rather than silently accepted.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::{MithrilError, Result};

const ISSUER: &str = "mithril-cms";

/// Claims carried by an access token (spec.md §4.8).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Encodes and validates HMAC-signed access tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.algorithms = vec![Algorithm::HS256];

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl_secs: ttl_secs as i64,
        }
    }

    /// Issue a signed access token for `admin_id`/`email`, expiring after
    /// this service's configured TTL (spec.md: 15 minutes).
    pub fn issue(&self, admin_id: &str, email: &str) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: admin_id.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + self.ttl_secs,
            iss: ISSUER.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| MithrilError::internal(format!("failed to sign access token: {}", e)))
    }

    /// Validate a token's signature, issuer, and expiry, returning its
    /// claims. Any non-HMAC signing method is rejected by construction —
    /// `self.validation.algorithms` only ever contains `HS256`.
    pub fn validate(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| MithrilError::unauthorized(format!("invalid access token: {}", e)))
    }
}
