//! Restaurant settings endpoints.

use axum::extract::State;

use crate::auth::AuthUser;
use crate::domain::{RestaurantSettings, SettingsUpdate};
use crate::error::{AppError, Result};
use crate::server::AppState;

use super::extract::ApiJson;
use super::response::ApiResponse;

/// GET /api/settings
#[tracing::instrument(name = "http.settings.get", skip(state))]
pub async fn get_settings(State(state): State<AppState>) -> Result<ApiResponse<RestaurantSettings>> {
    let settings = state.store.get_settings().await?.unwrap_or_default();
    Ok(ApiResponse::ok(settings))
}

/// PUT /api/settings
#[tracing::instrument(name = "http.settings.update", skip(state, auth, update), fields(user_id = %auth.id))]
pub async fn update_settings(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(update): ApiJson<SettingsUpdate>,
) -> Result<ApiResponse<RestaurantSettings>> {
    auth.require_manager()?;
    update.validate().map_err(AppError::Validation)?;

    let mut settings = state.store.get_settings().await?.unwrap_or_default();
    update.apply(&mut settings);

    if !settings.pickup_enabled && !settings.delivery_enabled {
        return Err(AppError::Validation(
            "At least one of pickup or delivery must stay enabled".to_string(),
        ));
    }

    state.store.save_settings(&settings).await?;
    state.dispatcher.settings_updated(&settings);

    tracing::info!(
        is_open = settings.is_open,
        accepting_orders = settings.accepting_orders,
        "Settings updated"
    );
    Ok(ApiResponse::ok(settings).with_message("Settings updated"))
}
