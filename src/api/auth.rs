//! Account endpoints: registration, login, profile and user administration.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{hash_password, verify_password, AuthUser};
use crate::domain::user::normalize_email;
use crate::domain::{Role, User};
use crate::error::{AppError, Result};
use crate::server::AppState;
use crate::store::StoreError;

use super::extract::{ApiJson, ApiPath};
use super::response::ApiResponse;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Email is invalid"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 7, max = 20, message = "Phone must be 7 to 20 characters"))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 7, max = 20, message = "Phone must be 7 to 20 characters"))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128, message = "New password must be at least 8 characters"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRoleRequest {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

/// POST /api/auth/register
#[tracing::instrument(name = "http.auth.register", skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<ApiResponse<AuthPayload>> {
    request.validate()?;

    let email = normalize_email(&request.email);
    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = hash_password(&request.password)?;
    let user = User::new(
        request.name.trim(),
        &email,
        request.phone,
        password_hash,
        Role::Customer,
    );

    match state.store.create_user(&user).await {
        Ok(()) => {}
        Err(StoreError::Conflict(_)) => {
            return Err(AppError::Conflict("Email already registered".to_string()))
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(user_id = %user.id, "User registered");
    let token = state.jwt.issue(&user)?;
    Ok(ApiResponse::created(AuthPayload { token, user }).with_message("Registration successful"))
}

/// POST /api/auth/login
#[tracing::instrument(name = "http.auth.login", skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<ApiResponse<AuthPayload>> {
    request.validate()?;

    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let user = state
        .store
        .find_user_by_email(&normalize_email(&request.email))
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&request.password, &user.password_hash) {
        tracing::warn!(user_id = %user.id, "Login with wrong password");
        return Err(invalid());
    }
    if !user.is_active {
        return Err(AppError::Unauthorized("Account is deactivated".to_string()));
    }

    let token = state.jwt.issue(&user)?;
    Ok(ApiResponse::ok(AuthPayload { token, user }).with_message("Login successful"))
}

/// GET /api/auth/me
#[tracing::instrument(name = "http.auth.me", skip(state, auth), fields(user_id = %auth.id))]
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> Result<ApiResponse<User>> {
    let user = state.store.get_user(auth.id).await?;
    Ok(ApiResponse::ok(user))
}

/// PUT /api/auth/profile
#[tracing::instrument(name = "http.auth.profile", skip(state, auth, request), fields(user_id = %auth.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<UpdateProfileRequest>,
) -> Result<ApiResponse<User>> {
    request.validate()?;

    let mut user = state.store.get_user(auth.id).await?;
    if let Some(name) = request.name {
        user.name = name.trim().to_string();
    }
    if let Some(phone) = request.phone {
        user.phone = Some(phone);
    }
    user.updated_at = chrono::Utc::now();
    state.store.update_user(&user).await?;

    Ok(ApiResponse::ok(user).with_message("Profile updated"))
}

/// PUT /api/auth/password
#[tracing::instrument(name = "http.auth.password", skip(state, auth, request), fields(user_id = %auth.id))]
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> Result<ApiResponse<serde_json::Value>> {
    request.validate()?;

    let mut user = state.store.get_user(auth.id).await?;
    if !verify_password(&request.current_password, &user.password_hash) {
        return Err(AppError::Validation("Current password is incorrect".to_string()));
    }

    user.password_hash = hash_password(&request.new_password)?;
    user.updated_at = chrono::Utc::now();
    state.store.update_user(&user).await?;

    tracing::info!(user_id = %user.id, "Password changed");
    Ok(ApiResponse::ok(serde_json::Value::Null).with_message("Password updated"))
}

/// GET /api/auth/users
#[tracing::instrument(name = "http.auth.users", skip(state, auth), fields(user_id = %auth.id))]
pub async fn list_users(State(state): State<AppState>, auth: AuthUser) -> Result<ApiResponse<Vec<User>>> {
    auth.require_admin()?;
    let users = state.store.list_users().await?;
    Ok(ApiResponse::ok(users))
}

/// PATCH /api/auth/users/{id}/role
#[tracing::instrument(name = "http.auth.user_role", skip(state, auth, request), fields(admin_id = %auth.id))]
pub async fn update_user_role(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateUserRoleRequest>,
) -> Result<ApiResponse<User>> {
    auth.require_admin()?;

    if request.role.is_none() && request.is_active.is_none() {
        return Err(AppError::Validation("Nothing to update".to_string()));
    }
    if id == auth.id && (request.is_active == Some(false) || request.role.is_some_and(|r| r != Role::Admin)) {
        return Err(AppError::Validation(
            "Administrators cannot demote or deactivate themselves".to_string(),
        ));
    }

    let mut user = state.store.get_user(id).await?;
    if let Some(role) = request.role {
        user.role = role;
    }
    if let Some(is_active) = request.is_active {
        user.is_active = is_active;
    }
    user.updated_at = chrono::Utc::now();
    state.store.update_user(&user).await?;

    tracing::info!(user_id = %user.id, role = %user.role, is_active = user.is_active, "User updated");
    Ok(ApiResponse::ok(user))
}
