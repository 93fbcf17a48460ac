//! Event names and payload builders.

use serde_json::{json, Value};

use crate::domain::{DeliveryLocation, MenuItem, Order, RestaurantSettings};

pub const ORDER_NEW: &str = "order:new";
pub const ORDER_STATUS_UPDATE: &str = "order:statusUpdate";
pub const MENU_AVAILABILITY_CHANGED: &str = "menu:availabilityChanged";
pub const DELIVERY_STATUS_CHANGED: &str = "delivery:statusChanged";
pub const SETTINGS_UPDATED: &str = "settings:updated";

pub fn order_new(order: &Order) -> Value {
    serde_json::to_value(order).unwrap_or_else(|_| json!({ "orderId": order.id }))
}

pub fn order_status_update(order: &Order) -> Value {
    json!({
        "orderId": order.id,
        "orderNumber": order.order_number,
        "status": order.status,
        "paymentStatus": order.payment_status,
        "updatedAt": order.updated_at,
    })
}

pub fn menu_availability_changed(item: &MenuItem) -> Value {
    json!({
        "menuItemId": item.id,
        "name": item.name,
        "available": item.available,
    })
}

pub fn delivery_status_changed(location: &DeliveryLocation) -> Value {
    json!({
        "locationId": location.id,
        "name": location.name,
        "isActive": location.is_active,
    })
}

pub fn settings_updated(settings: &RestaurantSettings) -> Value {
    serde_json::to_value(settings).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_availability_payload() {
        let mut item = MenuItem::new("Suya", Decimal::new(1500, 0), None);
        item.available = false;
        let payload = menu_availability_changed(&item);
        assert_eq!(payload["name"], "Suya");
        assert_eq!(payload["available"], false);
        assert_eq!(payload["menuItemId"], item.id.to_string());
    }

    #[test]
    fn test_delivery_payload() {
        let location = DeliveryLocation::new("Yaba", Decimal::new(500, 0));
        let payload = delivery_status_changed(&location);
        assert_eq!(payload["isActive"], true);
    }
}
