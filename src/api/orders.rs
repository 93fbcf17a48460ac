//! Order endpoints: checkout for cash orders, listings, tracking and the
//! kitchen status workflow.

use axum::extract::State;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{AuthUser, MaybeAuthUser};
use crate::domain::{Order, OrderFilter, OrderStats, OrderStatus, OrderType, PaymentMethod, PaymentStatus};
use crate::error::{AppError, Result};
use crate::metrics::OrderMetrics;
use crate::server::AppState;
use crate::services::{place_order, CreateOrderRequest};

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::response::{ApiResponse, Page, Pagination};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListQuery {
    pub status: Option<String>,
    #[serde(alias = "payment_status")]
    pub payment_status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl OrderListQuery {
    fn into_filter(self, user_id: Option<Uuid>) -> Result<OrderFilter> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<OrderStatus>)
            .transpose()
            .map_err(AppError::Validation)?;
        let payment_status = self
            .payment_status
            .as_deref()
            .map(str::parse::<PaymentStatus>)
            .transpose()
            .map_err(AppError::Validation)?;

        Ok(OrderFilter {
            status,
            payment_status,
            user_id,
            page: self.page.unwrap_or(1),
            limit: self.limit.unwrap_or(0),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedItem {
    pub name: String,
    pub quantity: i32,
}

/// Public view of an order; carries no contact details.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingView {
    pub id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub order_type: OrderType,
    pub payment_status: PaymentStatus,
    pub total: Decimal,
    pub items: Vec<TrackedItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for TrackingView {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number,
            status: order.status,
            order_type: order.order_type,
            payment_status: order.payment_status,
            total: order.total,
            items: order
                .items
                .into_iter()
                .map(|i| TrackedItem {
                    name: i.name,
                    quantity: i.quantity,
                })
                .collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

async fn list_page(state: &AppState, filter: OrderFilter) -> Result<Page<Order>> {
    let (items, total) = state.store.list_orders(&filter).await?;
    Ok(Page {
        items,
        pagination: Pagination::new(filter.page(), filter.limit(), total),
    })
}

async fn load_visible_order(state: &AppState, id: Uuid, auth: &AuthUser) -> Result<Order> {
    let order = state.store.get_order(id).await?;
    if !auth.is_staff() && !order.is_owned_by(auth.id) {
        return Err(AppError::forbidden());
    }
    Ok(order)
}

/// POST /api/orders
#[tracing::instrument(name = "http.orders.create", skip(state, auth, request))]
pub async fn create_order(
    State(state): State<AppState>,
    MaybeAuthUser(auth): MaybeAuthUser,
    ApiJson(request): ApiJson<CreateOrderRequest>,
) -> Result<ApiResponse<Order>> {
    if request.payment_method == Some(PaymentMethod::Online) {
        return Err(AppError::Validation(
            "Online orders must be placed through payment initialization".to_string(),
        ));
    }

    let order = place_order(state.store.as_ref(), request, auth.as_ref(), PaymentMethod::Cash).await?;
    state.dispatcher.order_created(&order);

    Ok(ApiResponse::created(order).with_message("Order placed"))
}

/// GET /api/orders
#[tracing::instrument(name = "http.orders.list", skip(state, auth, query), fields(user_id = %auth.id))]
pub async fn list_orders(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<OrderListQuery>,
) -> Result<ApiResponse<Page<Order>>> {
    auth.require_staff()?;
    let filter = query.into_filter(None)?;
    Ok(ApiResponse::ok(list_page(&state, filter).await?))
}

/// GET /api/orders/my
#[tracing::instrument(name = "http.orders.my", skip(state, auth, query), fields(user_id = %auth.id))]
pub async fn my_orders(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<OrderListQuery>,
) -> Result<ApiResponse<Page<Order>>> {
    let filter = query.into_filter(Some(auth.id))?;
    Ok(ApiResponse::ok(list_page(&state, filter).await?))
}

/// GET /api/orders/stats
#[tracing::instrument(name = "http.orders.stats", skip(state, auth), fields(user_id = %auth.id))]
pub async fn order_stats(State(state): State<AppState>, auth: AuthUser) -> Result<ApiResponse<OrderStats>> {
    auth.require_manager()?;
    let stats = state.store.order_stats().await?;
    Ok(ApiResponse::ok(stats))
}

/// GET /api/orders/track/{orderNumber}
#[tracing::instrument(name = "http.orders.track", skip(state))]
pub async fn track_order(
    State(state): State<AppState>,
    ApiPath(order_number): ApiPath<String>,
) -> Result<ApiResponse<TrackingView>> {
    let order = state
        .store
        .find_order_by_number(order_number.trim())
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;
    Ok(ApiResponse::ok(order.into()))
}

/// GET /api/orders/{id}
#[tracing::instrument(name = "http.orders.get", skip(state, auth), fields(user_id = %auth.id))]
pub async fn get_order(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<Order>> {
    let order = load_visible_order(&state, id, &auth).await?;
    Ok(ApiResponse::ok(order))
}

/// PATCH /api/orders/{id}/status
#[tracing::instrument(
    name = "http.orders.status",
    skip(state, auth, request),
    fields(user_id = %auth.id, status = %request.status)
)]
pub async fn update_status(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<StatusUpdateRequest>,
) -> Result<ApiResponse<Order>> {
    auth.require_staff()?;

    let order = state.store.get_order(id).await?;
    if !order.status.can_transition_to(request.status, order.order_type) {
        return Err(AppError::Validation(format!(
            "Cannot change order status from {} to {}",
            order.status, request.status
        )));
    }

    let updated = state.store.update_order_status(id, request.status).await?;
    OrderMetrics::record_status_update(updated.status.as_str());
    state.dispatcher.order_status_changed(&updated);

    tracing::info!(
        order_id = %updated.id,
        from = %order.status,
        to = %updated.status,
        "Order status updated"
    );
    Ok(ApiResponse::ok(updated))
}

/// POST /api/orders/{id}/cancel
#[tracing::instrument(name = "http.orders.cancel", skip(state, auth), fields(user_id = %auth.id))]
pub async fn cancel_order(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<Order>> {
    let order = load_visible_order(&state, id, &auth).await?;
    if order.status != OrderStatus::Pending {
        return Err(AppError::Validation(
            "Only pending orders can be cancelled".to_string(),
        ));
    }

    let cancelled = state.store.update_order_status(id, OrderStatus::Cancelled).await?;
    OrderMetrics::record_status_update(cancelled.status.as_str());
    state.dispatcher.order_status_changed(&cancelled);

    tracing::info!(order_id = %cancelled.id, "Order cancelled");
    Ok(ApiResponse::ok(cancelled).with_message("Order cancelled"))
}
