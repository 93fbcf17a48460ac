//! Bearer token extractors for handlers.

use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use uuid::Uuid;

use super::JwtService;
use crate::domain::Role;
use crate::error::AppError;
use crate::server::AppState;

/// Authenticated caller, taken from a valid `Authorization: Bearer` token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: Role,
}

impl AuthUser {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    /// ADMIN or MANAGER
    pub fn can_manage(&self) -> bool {
        self.role.can_manage()
    }

    /// Fail with 403 unless the caller holds one of `roles`.
    pub fn require_any(&self, roles: &[Role]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            tracing::warn!(user_id = %self.id, role = %self.role, required = ?roles, "Role check failed");
            Err(AppError::forbidden())
        }
    }

    pub fn require_manager(&self) -> Result<(), AppError> {
        self.require_any(&[Role::Admin, Role::Manager])
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        self.require_any(&[Role::Admin, Role::Manager, Role::Staff])
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        self.require_any(&[Role::Admin])
    }
}

/// Caller that may or may not be signed in (guest checkout, public tracking).
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve a raw token into the caller it identifies.
pub fn authenticate(token: &str, jwt: &JwtService) -> Result<AuthUser, AppError> {
    let claims = jwt.validate(token).inspect_err(|e| {
        tracing::warn!(error = %e, "JWT validation failed");
    })?;

    let id = claims
        .user_uuid()
        .ok_or_else(|| AppError::Unauthorized("Malformed token subject".to_string()))?;
    let role = claims
        .parsed_roles()
        .into_iter()
        .max()
        .unwrap_or(Role::Customer);

    Ok(AuthUser {
        id,
        email: claims.email,
        role,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let token = extract_bearer_token(parts).ok_or_else(AppError::unauthorized)?;
        let user = authenticate(token, &state.jwt)?;
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match extract_bearer_token(parts) {
            // A token that is present but invalid is still an error
            Some(token) => authenticate(token, &state.jwt).map(|u| MaybeAuthUser(Some(u))),
            None => Ok(MaybeAuthUser(None)),
        }
    }
}
