//! Bearer-token authentication.
//!
//! Tokens are verified by an external identity provider behind the
//! `IdentityVerifier` trait. Three extractors cover the route policies:
//! `AuthUser` (token required), `MaybeUser` (token optional, but must verify
//! when present) and `AdminUser` (token required with the `admin` claim).
//!
//! Without a configured provider (development), `MaybeUser` and `AdminUser`
//! let requests through unverified; `AuthUser` still rejects them.

pub mod firebase;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::state::AppState;

pub use firebase::FirebaseVerifier;

/// A verified caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub admin: bool,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token")]
    InvalidToken,

    #[error("identity provider error: {0}")]
    Provider(String),
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Fixed token table for tests.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct StaticVerifier {
    tokens: std::collections::HashMap<String, Identity>,
}

#[cfg(test)]
impl StaticVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, identity: Identity) -> Self {
        self.tokens.insert(token.to_string(), identity);
        self
    }
}

#[cfg(test)]
#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.tokens.get(token).cloned().ok_or(AuthError::InvalidToken)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn verify_token(state: &AppState, token: &str) -> Result<Identity, AppError> {
    let Some(verifier) = &state.verifier else {
        return Err(AppError::Unauthorized(
            "identity provider not configured".to_string(),
        ));
    };
    verifier.verify(token).await.map_err(|e| {
        warn!("Token verification failed: {e}");
        AppError::Unauthorized("Invalid token".to_string())
    })
}

/// Requires a verified bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("No token provided".to_string()))?;
        Ok(AuthUser(verify_token(state, token).await?))
    }
}

/// Anonymous callers pass through; a presented token must still verify when a
/// provider is configured.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Identity>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Ok(MaybeUser(None));
        };
        if state.verifier.is_none() {
            warn!("Identity provider not configured - treating caller as anonymous");
            return Ok(MaybeUser(None));
        }
        Ok(MaybeUser(Some(verify_token(state, token).await?)))
    }
}

/// Requires the `admin` claim. When no identity provider is configured the
/// check is skipped (development mode).
#[derive(Debug, Clone, Copy)]
pub struct AdminUser;

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        if state.verifier.is_none() {
            warn!("Identity provider not configured - skipping admin check");
            return Ok(AdminUser);
        }
        let AuthUser(identity) = AuthUser::from_request_parts(parts, state).await?;
        if !identity.admin {
            return Err(AppError::Forbidden("Not an admin".to_string()));
        }
        debug!(uid = %identity.uid, email = ?identity.email, "admin request");
        Ok(AdminUser)
    }
}
