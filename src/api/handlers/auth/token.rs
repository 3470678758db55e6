//! Bearer token verification and signing.
//!
//! Tokens are HMAC-signed JWTs carrying the principal id in a `user_id` claim.
//! Verification is pure: signature, algorithm and `exp` are checked locally,
//! with no store access, so a single verifier is shared by every request task.

use jsonwebtoken::{
    decode, encode, errors::Error as JwtError, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use super::{error::GateError, state::AuthConfig};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    pub exp: i64,
}

/// Parse a configured signing algorithm. Only the shared-secret HMAC family is
/// accepted, since the verifier and the issuer share one symmetric key.
///
/// # Errors
/// Returns an error for unknown names or non-HMAC algorithms.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, String> {
    match name.trim().to_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(format!(
            "unsupported algorithm `{other}`: expected HS256, HS384 or HS512"
        )),
    }
}

fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}

pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(config.algorithm());
        validation.leeway = 0;
        validation.validate_aud = false;
        Self {
            key: DecodingKey::from_secret(config.secret_key().expose_secret().as_bytes()),
            validation,
        }
    }

    /// Verify `token` and return the principal id it names.
    ///
    /// # Errors
    /// Returns [`GateError::InvalidToken`] for a bad signature, wrong algorithm,
    /// malformed token, elapsed `exp`, or a missing `user_id` claim. The reason
    /// is only logged.
    pub fn verify(&self, token: &str) -> Result<i64, GateError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|err| {
            debug!("Rejected bearer token: {err}");
            GateError::InvalidToken
        })?;

        data.claims.user_id.ok_or_else(|| {
            debug!("Rejected bearer token: missing user_id claim");
            GateError::InvalidToken
        })
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

/// Issues tokens the verifier accepts. Used by login flows and tests.
pub struct TokenSigner {
    key: EncodingKey,
    header: Header,
    ttl_seconds: i64,
}

impl TokenSigner {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            key: EncodingKey::from_secret(config.secret_key().expose_secret().as_bytes()),
            header: Header::new(config.algorithm()),
            ttl_seconds: i64::try_from(config.session_ttl().as_secs()).unwrap_or(i64::MAX),
        }
    }

    /// Sign a token for `principal_id`, valid for the configured session TTL.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn sign(&self, principal_id: i64) -> Result<String, JwtError> {
        let now = now_unix_seconds();
        self.sign_claims(&Claims {
            user_id: Some(principal_id),
            iat: Some(now),
            exp: now.saturating_add(self.ttl_seconds),
        })
    }

    /// Sign arbitrary claims.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn sign_claims(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&self.header, claims, &self.key)
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("alg", &self.header.alg)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}
