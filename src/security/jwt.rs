use crate::error::Error;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Role;

/// Claims
///
/// The structured payload signed into every session token. Verification either
/// yields this struct fully trusted or fails — there is no partial-trust state,
/// and a token whose signature does not match its payload is indistinguishable
/// from garbage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer; must match the codec's configured issuer on verification.
    pub iss: String,
    /// Subject: the user's primary key.
    #[serde(rename = "userKey")]
    pub user_key: i64,
    pub name: String,
    pub email: String,
    /// Authorities carried in the token (stateless-session design: roles are
    /// never re-read from storage per request).
    pub roles: Vec<String>,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch. Always strictly greater than `iat`.
    pub exp: i64,
}

/// Jwt
///
/// The session token codec: pure and stateless. Encodes/signs claims with a
/// process-wide secret (HS256) and verifies inbound tokens. Expiry policy
/// ("fails when expired") lives here; "expires soon" is a caller policy and is
/// exposed only as [`Jwt::remaining_lifetime`].
pub struct Jwt {
    issuer: String,
    expiry: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl Jwt {
    pub fn new(issuer: &str, secret: &str, expiry: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact: a token one second past `exp` must not verify.
        validation.leeway = 0;
        validation.set_issuer(&[issuer]);

        Self {
            issuer: issuer.to_string(),
            expiry,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// claims
    ///
    /// Builds a fresh claim set for the given user: `iat` is now, `exp` is
    /// now + the configured lifetime.
    pub fn claims(&self, user_key: i64, name: &str, email: &str, roles: &[Role]) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            iss: self.issuer.clone(),
            user_key,
            name: name.to_string(),
            email: email.to_string(),
            roles: roles.iter().map(|r| r.value().to_string()).collect(),
            iat: now,
            exp: now + self.expiry.as_secs() as i64,
        }
    }

    /// issue
    ///
    /// Serializes and signs the claims into a compact token string.
    /// Deterministic given identical claims (the timestamp lives in the claims).
    pub fn issue(&self, claims: &Claims) -> Result<String, Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("token issuance failed: {e}")))
    }

    /// verify
    ///
    /// Re-computes the signature over the embedded payload and validates the
    /// claims (issuer, expiry). Failure is total: malformed payload, signature
    /// mismatch and expiry all collapse into [`Error::InvalidToken`].
    pub fn verify(&self, token: &str) -> Result<Claims, Error> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| Error::InvalidToken(e.to_string()))?;

        // A verifying token must carry a forward-moving lifetime.
        if data.claims.exp <= data.claims.iat {
            return Err(Error::InvalidToken("exp must be greater than iat".to_string()));
        }

        Ok(data.claims)
    }

    /// refresh
    ///
    /// Issues a replacement token for already-verified claims: same identity
    /// and roles, fresh `iat`/`exp`. Callers decide *when* to refresh (see the
    /// request filter's threshold); this only knows *how*.
    pub fn refresh(&self, claims: &Claims) -> Result<String, Error> {
        let now = Utc::now().timestamp();
        // Identity and roles are carried over verbatim; a refresh never widens
        // or narrows authorities, it only moves the expiry forward.
        let renewed = Claims {
            iat: now,
            exp: now + self.expiry.as_secs() as i64,
            ..claims.clone()
        };
        self.issue(&renewed)
    }

    /// remaining_lifetime
    ///
    /// Seconds until the claims expire; negative when already expired. The
    /// caller decides what the sign means.
    pub fn remaining_lifetime(&self, claims: &Claims) -> i64 {
        claims.exp - Utc::now().timestamp()
    }
}
