//! Bearer-token authentication.
//!
//! Accounts and token issuance belong to the identity service; this server
//! only verifies HS256 JWTs and turns their claims into a [`CurrentUser`].
//!
//! Provides Axum extractors for:
//! - Bearer token extraction from the `Authorization` header
//! - Authenticated users ([`AuthUser`])
//! - Permission checks ([`RequireReservationManager`], [`RequireSystemManager`])
//!
//! # Usage
//!
//! ```rust,ignore
//! async fn list_pending(
//!     RequireReservationManager(admin): RequireReservationManager,
//!     State(state): State<AppState>,
//! ) -> Result<Json<ReservationsResponse>, AppError> {
//!     // admin is guaranteed to hold `manage_reservations`
//! }
//! ```

use crate::error::AppError;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use chrono::{Duration, Utc};
use equipment_booking_core::identity::{CurrentUser, Permission, Role};
use equipment_booking_core::types::UserId;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// JWT claims carried by bearer tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    /// Contact email
    pub email: String,
    /// Display name
    pub username: String,
    /// Role name, resolved to permissions on every request
    pub role: String,
    /// Expiry (seconds since the Unix epoch)
    pub exp: i64,
}

/// HS256 token verifier.
pub struct TokenVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}

impl TokenVerifier {
    /// Creates a verifier for `secret`.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Validates `token` and builds the caller context.
    ///
    /// # Errors
    ///
    /// Returns `401 Unauthorized` for a malformed, forged or expired token.
    pub fn verify(&self, token: &str) -> Result<CurrentUser, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Token rejected");
            AppError::unauthorized("Invalid or expired token")
        })?;
        let claims = data.claims;
        Ok(CurrentUser {
            id: UserId::from_uuid(claims.sub),
            email: claims.email,
            username: claims.username,
            role: Role::resolve(&claims.role),
        })
    }

    /// Signs a token for `user`, valid for `ttl`.
    ///
    /// Used by tests and operator tooling.
    ///
    /// # Errors
    ///
    /// Returns an internal error if signing fails.
    pub fn issue(&self, user: &CurrentUser, ttl: Duration) -> Result<String, AppError> {
        let claims = Claims {
            sub: *user.id.as_uuid(),
            email: user.email.clone(),
            username: user.username.clone(),
            role: user.role.name.clone(),
            exp: (Utc::now() + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::internal("Failed to sign token").with_source(e.into()))
    }
}

/// Bearer token extracted from `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::unauthorized("Invalid authorization format. Expected 'Bearer <token>'")
        })?;

        if token.trim().is_empty() {
            return Err(AppError::unauthorized("Empty bearer token"));
        }

        Ok(Self(token.trim().to_string()))
    }
}

/// Authenticated caller.
///
/// Use this as a handler parameter to require authentication.
#[derive(Debug, Clone)]
pub struct AuthUser(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<TokenVerifier>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let bearer = BearerToken::from_request_parts(parts, state).await?;
        let verifier = Arc::<TokenVerifier>::from_ref(state);
        let user = verifier.verify(&bearer.0)?;
        Ok(Self(user))
    }
}

async fn require<S>(
    parts: &mut Parts,
    state: &S,
    permission: Permission,
) -> Result<CurrentUser, AppError>
where
    S: Send + Sync,
    Arc<TokenVerifier>: FromRef<S>,
{
    let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
    user.require(permission)?;
    Ok(user)
}

/// Caller holding `manage_reservations`.
#[derive(Debug, Clone)]
pub struct RequireReservationManager(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for RequireReservationManager
where
    S: Send + Sync,
    Arc<TokenVerifier>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        require(parts, state, Permission::ManageReservations)
            .await
            .map(Self)
    }
}

/// Caller holding `manage_system`.
#[derive(Debug, Clone)]
pub struct RequireSystemManager(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for RequireSystemManager
where
    S: Send + Sync,
    Arc<TokenVerifier>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        require(parts, state, Permission::ManageSystem).await.map(Self)
    }
}
