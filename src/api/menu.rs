//! Menu and category endpoints.

use axum::extract::State;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthUser, MaybeAuthUser};
use crate::domain::{Category, MenuFilter, MenuItem, MAX_AMOUNT};
use crate::error::{AppError, Result};
use crate::server::AppState;
use crate::store::{DeleteOutcome, StoreError};

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::response::ApiResponse;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be 1 to 120 characters"))]
    pub name: String,
    #[validate(length(max = 1000, message = "Description is too long"))]
    pub description: Option<String>,
    pub price: Decimal,
    #[validate(url(message = "Image URL is invalid"))]
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub available: Option<bool>,
    #[validate(range(min = 0, max = 600, message = "Preparation time must be 0 to 600 minutes"))]
    pub preparation_time_minutes: Option<i32>,
}

impl MenuItemRequest {
    fn check(&self) -> Result<()> {
        self.validate()?;
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("Name must be 1 to 120 characters".to_string()));
        }
        if self.price <= Decimal::ZERO {
            return Err(AppError::Validation("Price must be greater than zero".to_string()));
        }
        if self.price > Decimal::from(MAX_AMOUNT) {
            return Err(AppError::Validation(format!("Price cannot exceed {}", MAX_AMOUNT)));
        }
        Ok(())
    }

    fn apply(self, item: &mut MenuItem) {
        item.name = self.name.trim().to_string();
        item.description = self.description;
        item.price = self.price;
        item.image_url = self.image_url;
        item.category_id = self.category_id;
        if let Some(available) = self.available {
            item.available = available;
        }
        item.preparation_time_minutes = self.preparation_time_minutes;
        item.updated_at = Utc::now();
    }
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub available: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 80, message = "Category name must be 1 to 80 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "Description is too long"))]
    pub description: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// Category references must point at an existing row; a dangling id is a bad request.
async fn ensure_category(state: &AppState, category_id: Option<Uuid>) -> Result<()> {
    let Some(id) = category_id else {
        return Ok(());
    };
    match state.store.get_category(id).await {
        Ok(_) => Ok(()),
        Err(StoreError::NotFound(_)) => Err(AppError::Validation("Category does not exist".to_string())),
        Err(e) => Err(e.into()),
    }
}

/// GET /api/menu
#[tracing::instrument(name = "http.menu.list", skip(state, filter))]
pub async fn list_items(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<MenuFilter>,
) -> Result<ApiResponse<Vec<MenuItem>>> {
    let items = state.store.list_menu_items(&filter).await?;
    Ok(ApiResponse::ok(items))
}

/// GET /api/menu/{id}
#[tracing::instrument(name = "http.menu.get", skip(state))]
pub async fn get_item(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<ApiResponse<MenuItem>> {
    let item = state.store.get_menu_item(id).await?;
    Ok(ApiResponse::ok(item))
}

/// POST /api/menu
#[tracing::instrument(name = "http.menu.create", skip(state, auth, request), fields(user_id = %auth.id))]
pub async fn create_item(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<MenuItemRequest>,
) -> Result<ApiResponse<MenuItem>> {
    auth.require_manager()?;
    request.check()?;
    ensure_category(&state, request.category_id).await?;

    let mut item = MenuItem::new(request.name.trim(), request.price, request.category_id);
    request.apply(&mut item);
    state.store.create_menu_item(&item).await?;

    tracing::info!(menu_item_id = %item.id, name = %item.name, "Menu item created");
    Ok(ApiResponse::created(item))
}

/// PUT /api/menu/{id}
#[tracing::instrument(name = "http.menu.update", skip(state, auth, request), fields(user_id = %auth.id))]
pub async fn update_item(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<MenuItemRequest>,
) -> Result<ApiResponse<MenuItem>> {
    auth.require_manager()?;
    request.check()?;

    let mut item = state.store.get_menu_item(id).await?;
    ensure_category(&state, request.category_id).await?;

    let was_available = item.available;
    request.apply(&mut item);
    state.store.update_menu_item(&item).await?;

    if item.available != was_available {
        state.dispatcher.menu_availability_changed(&item);
    }
    Ok(ApiResponse::ok(item))
}

/// PATCH /api/menu/{id}/availability
#[tracing::instrument(name = "http.menu.availability", skip(state, auth, request), fields(user_id = %auth.id))]
pub async fn set_availability(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<AvailabilityRequest>,
) -> Result<ApiResponse<MenuItem>> {
    auth.require_manager()?;

    let item = state.store.set_menu_item_availability(id, request.available).await?;
    state.dispatcher.menu_availability_changed(&item);

    tracing::info!(menu_item_id = %item.id, available = item.available, "Menu item availability changed");
    Ok(ApiResponse::ok(item))
}

/// DELETE /api/menu/{id}
#[tracing::instrument(name = "http.menu.delete", skip(state, auth), fields(user_id = %auth.id))]
pub async fn delete_item(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<serde_json::Value>> {
    auth.require_manager()?;

    let message = match state.store.delete_menu_item(id).await? {
        DeleteOutcome::Deleted => "Menu item deleted",
        DeleteOutcome::Disabled => {
            // Referenced by past orders, so it only stops being orderable
            if let Ok(item) = state.store.get_menu_item(id).await {
                state.dispatcher.menu_availability_changed(&item);
            }
            "Menu item is referenced by orders and was marked unavailable"
        }
    };
    Ok(ApiResponse::ok(serde_json::json!({ "id": id })).with_message(message))
}

/// GET /api/menu/categories
#[tracing::instrument(name = "http.menu.categories", skip(state, auth, query))]
pub async fn list_categories(
    State(state): State<AppState>,
    MaybeAuthUser(auth): MaybeAuthUser,
    ApiQuery(query): ApiQuery<CategoryQuery>,
) -> Result<ApiResponse<Vec<Category>>> {
    let include_inactive = query.include_inactive && auth.is_some_and(|a| a.is_staff());
    let categories = state.store.list_categories(include_inactive).await?;
    Ok(ApiResponse::ok(categories))
}

/// POST /api/menu/categories
#[tracing::instrument(name = "http.menu.category_create", skip(state, auth, request), fields(user_id = %auth.id))]
pub async fn create_category(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<CategoryRequest>,
) -> Result<ApiResponse<Category>> {
    auth.require_manager()?;
    request.validate()?;

    let mut category = Category::new(
        request.name.trim(),
        request.description,
        request.sort_order.unwrap_or(0),
    );
    if let Some(is_active) = request.is_active {
        category.is_active = is_active;
    }
    state.store.create_category(&category).await?;
    Ok(ApiResponse::created(category))
}

/// PUT /api/menu/categories/{id}
#[tracing::instrument(name = "http.menu.category_update", skip(state, auth, request), fields(user_id = %auth.id))]
pub async fn update_category(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<CategoryRequest>,
) -> Result<ApiResponse<Category>> {
    auth.require_manager()?;
    request.validate()?;

    let mut category = state.store.get_category(id).await?;
    category.name = request.name.trim().to_string();
    category.description = request.description;
    if let Some(sort_order) = request.sort_order {
        category.sort_order = sort_order;
    }
    if let Some(is_active) = request.is_active {
        category.is_active = is_active;
    }
    category.updated_at = Utc::now();
    state.store.update_category(&category).await?;
    Ok(ApiResponse::ok(category))
}

/// DELETE /api/menu/categories/{id}
#[tracing::instrument(name = "http.menu.category_delete", skip(state, auth), fields(user_id = %auth.id))]
pub async fn delete_category(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<serde_json::Value>> {
    auth.require_manager()?;
    state.store.delete_category(id).await?;
    Ok(ApiResponse::ok(serde_json::json!({ "id": id })).with_message("Category deleted"))
}
