//! JWT bearer token creation and verification.
//!
//! Tokens are HS512-signed and carry the user's email as `sub` plus the numeric user id. They are
//! stateless: a token is valid while its signature checks out and `exp` is in the future. There
//! is no server-side revocation.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{config::Config, db::models::users::UserDBResponse, errors::Error, types::UserId};

/// JWT session claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // Subject (user email)
    pub id: UserId,  // User id
    pub iat: i64,    // Issued at, seconds since epoch
    pub exp: i64,    // Expiration time, seconds since epoch
}

/// Mints and verifies bearer tokens with a server-held secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").field("ttl_secs", &self.ttl_secs).finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            // exp has one second resolution; never mint an already-expired token
            ttl_secs: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let secret = config.secret_key.as_ref().ok_or_else(|| Error::Internal {
            operation: "JWT sessions: secret_key is required".to_string(),
        })?;
        Ok(Self::new(secret.as_bytes(), config.auth.security.jwt_expiry))
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Create a token for `user`, valid from now for the configured TTL.
    pub fn issue(&self, user: &UserDBResponse) -> Result<String, Error> {
        self.issue_at(user, Utc::now().timestamp())
    }

    /// Create a token as if issued at `now` (seconds since epoch).
    pub fn issue_at(&self, user: &UserDBResponse, now: i64) -> Result<String, Error> {
        let claims = SessionClaims {
            sub: user.email.clone(),
            id: user.id,
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
        };

        encode(&Header::new(Algorithm::HS512), &claims, &self.encoding).map_err(|e| Error::Internal {
            operation: format!("create JWT: {e}"),
        })
    }

    /// Decode and check a token against the current time.
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Decode and check a token as of `now`. Malformed input, a bad signature, a wrong algorithm
    /// and expiry all yield `None`.
    pub fn verify_at(&self, token: &str, now: i64) -> Option<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS512);
        // Expiry is checked below against the caller's clock
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = match decode::<SessionClaims>(token, &self.decoding, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                trace!("Rejected bearer token: {e}");
                return None;
            }
        };

        if now >= claims.exp {
            trace!("Rejected expired bearer token for {}", claims.sub);
            return None;
        }
        Some(claims)
    }

    /// True iff the token is well formed, correctly signed and unexpired.
    pub fn validate(&self, token: &str) -> bool {
        self.verify(token).is_some()
    }

    /// The email the token was issued for, if the token is valid.
    pub fn subject(&self, token: &str) -> Option<String> {
        self.verify(token).map(|claims| claims.sub)
    }
}
