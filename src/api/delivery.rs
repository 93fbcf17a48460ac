//! Delivery location and area endpoints.

use axum::extract::State;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthUser, MaybeAuthUser};
use crate::domain::{DeliveryArea, DeliveryLocation, MAX_AMOUNT};
use crate::error::{AppError, Result};
use crate::server::AppState;
use crate::store::DeleteOutcome;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::response::ApiResponse;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LocationRequest {
    #[validate(length(min = 1, max = 120, message = "Location name must be 1 to 120 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "Description is too long"))]
    pub description: Option<String>,
    pub delivery_fee: Decimal,
    #[validate(range(min = 0, max = 600, message = "Estimated time must be 0 to 600 minutes"))]
    pub estimated_minutes: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AreaRequest {
    #[validate(length(min = 1, max = 120, message = "Area name must be 1 to 120 characters"))]
    pub name: String,
    #[serde(default)]
    pub additional_fee: Decimal,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct LocationQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Serialize)]
pub struct LocationWithAreas {
    #[serde(flatten)]
    pub location: DeliveryLocation,
    pub areas: Vec<DeliveryArea>,
}

fn non_negative(amount: Decimal, what: &str) -> Result<()> {
    if amount.is_sign_negative() {
        return Err(AppError::Validation(format!("{} cannot be negative", what)));
    }
    if amount > Decimal::from(MAX_AMOUNT) {
        return Err(AppError::Validation(format!("{} cannot exceed {}", what, MAX_AMOUNT)));
    }
    Ok(())
}

/// Hide inactive locations from callers who are not staff.
async fn visible_location(state: &AppState, id: Uuid, auth: Option<&AuthUser>) -> Result<DeliveryLocation> {
    let location = state.store.get_location(id).await?;
    if !location.is_active && !auth.is_some_and(|a| a.is_staff()) {
        return Err(AppError::not_found("Delivery location"));
    }
    Ok(location)
}

/// GET /api/delivery-locations
#[tracing::instrument(name = "http.delivery.list", skip(state, auth, query))]
pub async fn list_locations(
    State(state): State<AppState>,
    MaybeAuthUser(auth): MaybeAuthUser,
    ApiQuery(query): ApiQuery<LocationQuery>,
) -> Result<ApiResponse<Vec<LocationWithAreas>>> {
    let include_inactive = query.include_inactive && auth.is_some_and(|a| a.is_staff());

    let locations = state.store.list_locations(include_inactive).await?;
    let mut result = Vec::with_capacity(locations.len());
    for location in locations {
        let areas = state.store.list_areas(location.id, include_inactive).await?;
        result.push(LocationWithAreas { location, areas });
    }
    Ok(ApiResponse::ok(result))
}

/// GET /api/delivery-locations/{id}
#[tracing::instrument(name = "http.delivery.get", skip(state, auth))]
pub async fn get_location(
    State(state): State<AppState>,
    MaybeAuthUser(auth): MaybeAuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<LocationWithAreas>> {
    let include_inactive = auth.as_ref().is_some_and(|a| a.is_staff());
    let location = visible_location(&state, id, auth.as_ref()).await?;
    let areas = state.store.list_areas(location.id, include_inactive).await?;
    Ok(ApiResponse::ok(LocationWithAreas { location, areas }))
}

/// POST /api/delivery-locations
#[tracing::instrument(name = "http.delivery.create", skip(state, auth, request), fields(user_id = %auth.id))]
pub async fn create_location(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<LocationRequest>,
) -> Result<ApiResponse<DeliveryLocation>> {
    auth.require_manager()?;
    request.validate()?;
    non_negative(request.delivery_fee, "Delivery fee")?;

    let mut location = DeliveryLocation::new(request.name.trim(), request.delivery_fee);
    location.description = request.description;
    location.estimated_minutes = request.estimated_minutes;
    if let Some(is_active) = request.is_active {
        location.is_active = is_active;
    }
    state.store.create_location(&location).await?;

    tracing::info!(location_id = %location.id, name = %location.name, "Delivery location created");
    Ok(ApiResponse::created(location))
}

/// PUT /api/delivery-locations/{id}
#[tracing::instrument(name = "http.delivery.update", skip(state, auth, request), fields(user_id = %auth.id))]
pub async fn update_location(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<LocationRequest>,
) -> Result<ApiResponse<DeliveryLocation>> {
    auth.require_manager()?;
    request.validate()?;
    non_negative(request.delivery_fee, "Delivery fee")?;

    let mut location = state.store.get_location(id).await?;
    let was_active = location.is_active;
    location.name = request.name.trim().to_string();
    location.description = request.description;
    location.delivery_fee = request.delivery_fee;
    location.estimated_minutes = request.estimated_minutes;
    if let Some(is_active) = request.is_active {
        location.is_active = is_active;
    }
    location.updated_at = Utc::now();
    state.store.update_location(&location).await?;

    if location.is_active != was_active {
        state.dispatcher.delivery_status_changed(&location);
    }
    Ok(ApiResponse::ok(location))
}

/// PATCH /api/delivery-locations/{id}/status
#[tracing::instrument(name = "http.delivery.status", skip(state, auth, request), fields(user_id = %auth.id))]
pub async fn set_location_status(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> Result<ApiResponse<DeliveryLocation>> {
    auth.require_manager()?;

    let location = state.store.set_location_active(id, request.is_active).await?;
    state.dispatcher.delivery_status_changed(&location);

    tracing::info!(location_id = %location.id, is_active = location.is_active, "Delivery location status changed");
    Ok(ApiResponse::ok(location))
}

/// DELETE /api/delivery-locations/{id}
#[tracing::instrument(name = "http.delivery.delete", skip(state, auth), fields(user_id = %auth.id))]
pub async fn delete_location(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<serde_json::Value>> {
    auth.require_manager()?;

    let message = match state.store.delete_location(id).await? {
        DeleteOutcome::Deleted => "Delivery location deleted",
        DeleteOutcome::Disabled => {
            if let Ok(location) = state.store.get_location(id).await {
                state.dispatcher.delivery_status_changed(&location);
            }
            "Delivery location is referenced by orders and was deactivated"
        }
    };
    Ok(ApiResponse::ok(serde_json::json!({ "id": id })).with_message(message))
}

/// GET /api/delivery-locations/{id}/areas
#[tracing::instrument(name = "http.delivery.areas", skip(state, auth))]
pub async fn list_areas(
    State(state): State<AppState>,
    MaybeAuthUser(auth): MaybeAuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<Vec<DeliveryArea>>> {
    let include_inactive = auth.as_ref().is_some_and(|a| a.is_staff());
    let location = visible_location(&state, id, auth.as_ref()).await?;
    let areas = state.store.list_areas(location.id, include_inactive).await?;
    Ok(ApiResponse::ok(areas))
}

/// POST /api/delivery-locations/{id}/areas
#[tracing::instrument(name = "http.delivery.area_create", skip(state, auth, request), fields(user_id = %auth.id))]
pub async fn create_area(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<AreaRequest>,
) -> Result<ApiResponse<DeliveryArea>> {
    auth.require_manager()?;
    request.validate()?;
    non_negative(request.additional_fee, "Additional fee")?;

    let location = state.store.get_location(id).await?;
    let mut area = DeliveryArea::new(location.id, request.name.trim(), request.additional_fee);
    if let Some(is_active) = request.is_active {
        area.is_active = is_active;
    }
    state.store.create_area(&area).await?;
    Ok(ApiResponse::created(area))
}

/// PUT /api/delivery-locations/areas/{areaId}
#[tracing::instrument(name = "http.delivery.area_update", skip(state, auth, request), fields(user_id = %auth.id))]
pub async fn update_area(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(area_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<AreaRequest>,
) -> Result<ApiResponse<DeliveryArea>> {
    auth.require_manager()?;
    request.validate()?;
    non_negative(request.additional_fee, "Additional fee")?;

    let mut area = state.store.get_area(area_id).await?;
    area.name = request.name.trim().to_string();
    area.additional_fee = request.additional_fee;
    if let Some(is_active) = request.is_active {
        area.is_active = is_active;
    }
    area.updated_at = Utc::now();
    state.store.update_area(&area).await?;
    Ok(ApiResponse::ok(area))
}

/// DELETE /api/delivery-locations/areas/{areaId}
#[tracing::instrument(name = "http.delivery.area_delete", skip(state, auth), fields(user_id = %auth.id))]
pub async fn delete_area(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(area_id): ApiPath<Uuid>,
) -> Result<ApiResponse<serde_json::Value>> {
    auth.require_manager()?;

    let message = match state.store.delete_area(area_id).await? {
        DeleteOutcome::Deleted => "Delivery area deleted",
        DeleteOutcome::Disabled => "Delivery area is referenced by orders and was deactivated",
    };
    Ok(ApiResponse::ok(serde_json::json!({ "id": area_id })).with_message(message))
}
