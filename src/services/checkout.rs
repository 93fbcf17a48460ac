//! Order placement: validation, pricing against current menu prices and
//! persistence of the order with its items.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::domain::delivery::delivery_fee;
use crate::domain::{
    generate_order_number, generate_payment_reference, price_order, MenuItem, Order, OrderStatus,
    OrderType, PaymentMethod, PaymentStatus, RestaurantSettings,
};
use crate::domain::order::MAX_ITEM_QUANTITY;
use crate::error::AppError;
use crate::metrics::OrderMetrics;
use crate::store::{Store, StoreError};

/// Attempts at finding an unused order number before giving up
const ORDER_NUMBER_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub menu_item_id: Uuid,
    #[validate(range(min = 1, max = 100, message = "Quantity must be between 1 and 100"))]
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 120, message = "Customer name is required"))]
    pub customer_name: String,
    #[validate(email(message = "Customer email is invalid"))]
    pub customer_email: Option<String>,
    #[validate(length(min = 7, max = 20, message = "Customer phone must be 7 to 20 characters"))]
    pub customer_phone: String,
    pub order_type: OrderType,
    pub delivery_location_id: Option<Uuid>,
    pub delivery_area_id: Option<Uuid>,
    #[validate(length(max = 500, message = "Delivery address is too long"))]
    pub delivery_address: Option<String>,
    #[validate(length(max = 1000, message = "Notes are too long"))]
    pub notes: Option<String>,
    #[validate(
        length(min = 1, message = "Order must contain at least one item"),
        nested
    )]
    pub items: Vec<OrderLineRequest>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

fn rejected(reason: &str, message: impl Into<String>) -> AppError {
    OrderMetrics::record_rejected(reason);
    AppError::Validation(message.into())
}

/// Merge duplicate lines, keeping first-seen order.
fn merge_lines(lines: &[OrderLineRequest]) -> Result<Vec<(Uuid, u32)>, AppError> {
    let mut merged: Vec<(Uuid, u32)> = Vec::with_capacity(lines.len());
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for line in lines {
        match index.get(&line.menu_item_id) {
            Some(&i) => merged[i].1 += line.quantity,
            None => {
                index.insert(line.menu_item_id, merged.len());
                merged.push((line.menu_item_id, line.quantity));
            }
        }
    }

    if merged.iter().any(|(_, q)| *q == 0 || *q > MAX_ITEM_QUANTITY) {
        return Err(rejected(
            "quantity",
            format!("Quantity must be between 1 and {}", MAX_ITEM_QUANTITY),
        ));
    }
    Ok(merged)
}

/// Load settings, falling back to "no restrictions" when the lookup fails.
async fn load_settings(store: &dyn Store) -> Option<RestaurantSettings> {
    match store.get_settings().await {
        Ok(settings) => Some(settings.unwrap_or_default()),
        Err(e) => {
            tracing::warn!(error = %e, "Settings unavailable, accepting order without restaurant checks");
            None
        }
    }
}

/// Resolved delivery target: (location id, area id, address, fee)
type DeliveryTarget = (Option<Uuid>, Option<Uuid>, Option<String>, rust_decimal::Decimal);

async fn resolve_delivery(store: &dyn Store, request: &CreateOrderRequest) -> Result<DeliveryTarget, AppError> {
    if request.order_type == OrderType::Pickup {
        return Ok((None, None, None, rust_decimal::Decimal::ZERO));
    }

    let location_id = request
        .delivery_location_id
        .ok_or_else(|| rejected("delivery", "Delivery location is required for delivery orders"))?;
    let address = request
        .delivery_address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| rejected("delivery", "Delivery address is required for delivery orders"))?;

    let location = match store.get_location(location_id).await {
        Ok(location) => location,
        Err(StoreError::NotFound(_)) => return Err(rejected("delivery", "Delivery location not found")),
        Err(e) => return Err(e.into()),
    };
    if !location.is_active {
        return Err(rejected("delivery", format!("Delivery to {} is currently unavailable", location.name)));
    }

    let area = match request.delivery_area_id {
        Some(area_id) => {
            let area = match store.get_area(area_id).await {
                Ok(area) => area,
                Err(StoreError::NotFound(_)) => return Err(rejected("delivery", "Delivery area not found")),
                Err(e) => return Err(e.into()),
            };
            if area.location_id != location.id {
                return Err(rejected("delivery", "Delivery area does not belong to the selected location"));
            }
            if !area.is_active {
                return Err(rejected("delivery", format!("Delivery to {} is currently unavailable", area.name)));
            }
            Some(area)
        }
        None => None,
    };

    let fee = delivery_fee(&location, area.as_ref());
    Ok((Some(location.id), area.map(|a| a.id), Some(address.to_string()), fee))
}

async fn resolve_items(store: &dyn Store, lines: &[(Uuid, u32)]) -> Result<Vec<(MenuItem, u32)>, AppError> {
    let ids: Vec<Uuid> = lines.iter().map(|(id, _)| *id).collect();
    let found: HashMap<Uuid, MenuItem> = store
        .get_menu_items(&ids)
        .await?
        .into_iter()
        .map(|item| (item.id, item))
        .collect();

    let mut resolved = Vec::with_capacity(lines.len());
    for (id, quantity) in lines {
        let item = found
            .get(id)
            .ok_or_else(|| rejected("menu_item", format!("Menu item {} not found", id)))?;
        if !item.available {
            return Err(rejected("unavailable", format!("{} is currently unavailable", item.name)));
        }
        resolved.push((item.clone(), *quantity));
    }
    Ok(resolved)
}

/// Validate and persist a new order. Prices always come from the menu.
#[tracing::instrument(
    name = "checkout.place_order",
    skip(store, request, user),
    fields(order_type = %request.order_type, items = request.items.len())
)]
pub async fn place_order(
    store: &dyn Store,
    request: CreateOrderRequest,
    user: Option<&AuthUser>,
    payment_method: PaymentMethod,
) -> Result<Order, AppError> {
    request.validate()?;

    let customer_email = request
        .customer_email
        .clone()
        .or_else(|| user.and_then(|u| u.email.clone()));
    if payment_method == PaymentMethod::Online && customer_email.is_none() {
        return Err(rejected("email", "Customer email is required for online payment"));
    }

    let lines = merge_lines(&request.items)?;

    let settings = load_settings(store).await;
    if let Some(ref settings) = settings {
        if let Some(reason) = settings.order_block_reason() {
            return Err(rejected("closed", reason));
        }
        match request.order_type {
            OrderType::Pickup if !settings.pickup_enabled => {
                return Err(rejected("pickup_disabled", "Pickup orders are not available right now"));
            }
            OrderType::Delivery if !settings.delivery_enabled => {
                return Err(rejected("delivery_disabled", "Delivery orders are not available right now"));
            }
            _ => {}
        }
    }

    let (delivery_location_id, delivery_area_id, delivery_address, fee) =
        resolve_delivery(store, &request).await?;
    let items = resolve_items(store, &lines).await?;

    let order_id = Uuid::new_v4();
    let priced = price_order(order_id, &items, fee)
        .ok_or_else(|| rejected("amount", "Order total is too large"))?;

    if let Some(ref settings) = settings {
        if priced.subtotal < settings.minimum_order_amount {
            return Err(rejected(
                "minimum",
                format!(
                    "Minimum order amount is {} {}",
                    settings.minimum_order_amount, settings.currency
                ),
            ));
        }
    }

    let now = Utc::now();
    let mut order = Order {
        id: order_id,
        order_number: generate_order_number(now),
        user_id: user.map(|u| u.id),
        customer_name: request.customer_name.trim().to_string(),
        customer_email,
        customer_phone: request.customer_phone.trim().to_string(),
        order_type: request.order_type,
        delivery_location_id,
        delivery_area_id,
        delivery_address,
        notes: request.notes.filter(|n| !n.trim().is_empty()),
        subtotal: priced.subtotal,
        delivery_fee: priced.delivery_fee,
        total: priced.total,
        status: OrderStatus::Pending,
        payment_method,
        payment_status: PaymentStatus::Pending,
        payment_reference: (payment_method == PaymentMethod::Online)
            .then(|| generate_payment_reference(now)),
        transaction_reference: None,
        paid_at: None,
        created_at: now,
        updated_at: now,
        items: priced.items,
    };

    let mut attempt = 1;
    loop {
        match store.create_order(&order).await {
            Ok(()) => break,
            Err(StoreError::Conflict(msg)) if attempt < ORDER_NUMBER_ATTEMPTS => {
                tracing::warn!(attempt = attempt, error = %msg, "Order number collision, regenerating");
                order.order_number = generate_order_number(now);
                if let Some(ref mut reference) = order.payment_reference {
                    *reference = generate_payment_reference(now);
                }
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    OrderMetrics::record_created(payment_method.as_str());
    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        total = %order.total,
        payment_method = %payment_method,
        "Order placed"
    );

    Ok(order)
}
