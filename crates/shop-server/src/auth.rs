//! Session authentication for the order listing routes.
//!
//! Handlers ask for a caller through the `RequireAuth` / `RequireAdmin`
//! extractors. Both read `Authorization: Bearer <token>` and hand the token to
//! the `SessionValidator` in the application state, so the token format stays
//! out of the handlers.
//!
//! ```text
//! Request → RequireAuth → SessionValidator::validate → AuthenticatedUser
//!                                                    ↘ 401 / 403 JSON
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::handlers::ErrorResponse;
use crate::state::AppState;

/// Caller role
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    fn from_claim(role: Option<&str>) -> Self {
        match role {
            Some(r) if r.eq_ignore_ascii_case("admin") => Self::Admin,
            _ => Self::User,
        }
    }
}

/// Identity behind a validated session token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Sessions are not configured")]
    NotConfigured,

    #[error("Admin access required")]
    Forbidden,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Forbidden => "FORBIDDEN",
            Self::TokenExpired => "TOKEN_EXPIRED",
            _ => "UNAUTHORIZED",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorResponse {
                success: false,
                message: self.to_string(),
                code: self.code().into(),
            }),
        )
            .into_response()
    }
}

/// Turns a bearer token into a caller
pub trait SessionValidator: Send + Sync {
    fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

/// Session token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,

    #[serde(default)]
    pub role: Option<String>,

    /// Expiry, seconds since the epoch
    pub exp: i64,
}

/// HS256 session tokens signed with a shared secret
pub struct JwtSessionValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtSessionValidator {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl SessionValidator for JwtSessionValidator {
    fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Rejected session token");
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;

        if data.claims.sub.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        Ok(AuthenticatedUser {
            role: Role::from_claim(data.claims.role.as_deref()),
            user_id: data.claims.sub,
        })
    }
}

/// Installed when no session secret is configured
pub struct RejectAllValidator;

impl SessionValidator for RejectAllValidator {
    fn validate(&self, _token: &str) -> Result<AuthenticatedUser, AuthError> {
        Err(AuthError::NotConfigured)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Extractor for routes that need a signed-in caller
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;
        state.sessions.validate(token).map(Self)
    }
}

/// Extractor for admin-only routes
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthenticatedUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::warn!(user_id = %user.user_id, "Non-admin attempted admin route");
            return Err(AuthError::Forbidden);
        }
        Ok(Self(user))
    }
}
