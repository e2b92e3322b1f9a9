//! HS256 token verification and issuing.
//!
//! Tokens carry `{user_id, role, exp, iat}`. The display name is not part of
//! the token; WebSocket clients supply it as a query parameter.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, AuthError};

/// Role allowed to publish events into a room.
pub const HOST_ROLE: &str = "host";

/// Token claims.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Numeric user id.
    pub user_id: i64,
    /// Role label, e.g. `host` or `participant`.
    pub role: String,
    /// Expiry (seconds since the epoch).
    pub exp: i64,
    /// Issued-at (seconds since the epoch).
    pub iat: i64,
}

impl Claims {
    /// Whether these claims carry the host role.
    pub fn is_host(&self) -> bool {
        self.role == HOST_ROLE
    }
}

/// Signs and verifies tokens with one shared secret.
pub struct JwtVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtVerifier {
    /// Create a verifier for `secret`. Issued tokens live for `ttl`.
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Check signature, algorithm and expiry, and return the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Missing);
        }
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }

    /// Mint a token for `user_id` with `role`, valid from now for the configured lifetime.
    pub fn issue(&self, user_id: i64, role: &str) -> Result<String, AuthError> {
        let now = chrono::Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        self.sign(&Claims {
            user_id,
            role: role.to_string(),
            exp: now.saturating_add(ttl),
            iat: now,
        })
    }

    /// Sign arbitrary claims.
    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.encoding,
        )?)
    }
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// The token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Extractor for requests carrying a valid bearer token.
#[derive(Clone, Debug)]
pub struct AuthUser(pub Claims);

impl<S> FromRequestParts<S> for AuthUser
where
    Arc<JwtVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = Arc::<JwtVerifier>::from_ref(state);
        let token = bearer_token(&parts.headers).ok_or(AuthError::Missing)?;
        Ok(Self(verifier.verify(token)?))
    }
}

/// Extractor that additionally requires the host role.
#[derive(Clone, Debug)]
pub struct HostUser(pub Claims);

impl<S> FromRequestParts<S> for HostUser
where
    Arc<JwtVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        if !claims.is_host() {
            return Err(ApiError::Forbidden(
                "only the host can perform this action".into(),
            ));
        }
        Ok(Self(claims))
    }
}
