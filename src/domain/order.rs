use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::MenuItem;

/// Maximum quantity of a single menu item per order
pub const MAX_ITEM_QUANTITY: u32 = 100;

/// Maximum page size for order listings
pub const MAX_PAGE_SIZE: u32 = 100;

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_uppercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("Unknown {}: {}", stringify!($name), other)),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    OutForDelivery,
    Delivered,
    Cancelled,
}

string_enum!(OrderStatus {
    Pending => "PENDING",
    Confirmed => "CONFIRMED",
    Preparing => "PREPARING",
    Ready => "READY",
    OutForDelivery => "OUT_FOR_DELIVERY",
    Delivered => "DELIVERED",
    Cancelled => "CANCELLED",
});

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Whether an order of `order_type` may move from `self` to `next`.
    pub fn can_transition_to(&self, next: OrderStatus, order_type: OrderType) -> bool {
        use OrderStatus::*;

        match (self, next) {
            (Pending, Confirmed) => true,
            (Confirmed, Preparing) => true,
            (Preparing, Ready) => true,
            (Ready, OutForDelivery) => order_type == OrderType::Delivery,
            (Ready, Delivered) => order_type == OrderType::Pickup,
            (OutForDelivery, Delivered) => true,
            (Pending | Confirmed | Preparing, Cancelled) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Delivery,
    Pickup,
}

string_enum!(OrderType {
    Delivery => "DELIVERY",
    Pickup => "PICKUP",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Pay on delivery or at the counter
    Cash,
    /// Card or transfer through the payment gateway
    Online,
}

string_enum!(PaymentMethod {
    Cash => "CASH",
    Online => "ONLINE",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

string_enum!(PaymentStatus {
    Pending => "PENDING",
    Paid => "PAID",
    Failed => "FAILED",
    Refunded => "REFUNDED",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub menu_item_id: Uuid,
    /// Name at the time of ordering
    pub name: String,
    /// Price at the time of ordering
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: String,
    pub order_type: OrderType,
    pub delivery_location_id: Option<Uuid>,
    pub delivery_area_id: Option<Uuid>,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub transaction_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Subtotal equals the sum of line totals, and each line total equals price × quantity.
    pub fn totals_consistent(&self) -> bool {
        let lines_ok = self
            .items
            .iter()
            .all(|i| i.line_total == i.unit_price * Decimal::from(i.quantity));
        let sum: Decimal = self.items.iter().map(|i| i.line_total).sum();
        lines_ok && sum == self.subtotal && self.total == self.subtotal + self.delivery_fee
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == Some(user_id)
    }
}

/// Line items and totals computed from current menu prices
#[derive(Debug, Clone)]
pub struct PricedOrder {
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
}

/// Price `lines` for order `order_id`. Quantities are assumed validated.
///
/// Returns `None` when a line or the total overflows `Decimal`.
pub fn price_order(order_id: Uuid, lines: &[(MenuItem, u32)], delivery_fee: Decimal) -> Option<PricedOrder> {
    let mut items = Vec::with_capacity(lines.len());
    let mut subtotal = Decimal::ZERO;

    for (menu_item, quantity) in lines {
        let quantity = i32::try_from(*quantity).ok()?;
        let line_total = menu_item.price.checked_mul(Decimal::from(quantity))?;
        subtotal = subtotal.checked_add(line_total)?;
        items.push(OrderItem {
            id: Uuid::new_v4(),
            order_id,
            menu_item_id: menu_item.id,
            name: menu_item.name.clone(),
            unit_price: menu_item.price,
            quantity,
            line_total,
        });
    }

    Some(PricedOrder {
        items,
        subtotal,
        delivery_fee,
        total: subtotal.checked_add(delivery_fee)?,
    })
}

fn random_suffix(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect()
}

/// Human-readable order number, e.g. `ORD-20260118-7GQ2XK`
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    format!("ORD-{}-{}", now.format("%Y%m%d"), random_suffix(6))
}

/// Merchant-side reference sent to the payment gateway
pub fn generate_payment_reference(now: DateTime<Utc>) -> String {
    format!("FOOD-{}-{}", now.timestamp_millis(), random_suffix(8))
}

/// Listing filter for staff order queries
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub user_id: Option<Uuid>,
    pub page: u32,
    pub limit: u32,
}

impl OrderFilter {
    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    pub fn limit(&self) -> u32 {
        match self.limit {
            0 => 20,
            n => n.min(MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.limit())
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.status.map_or(true, |s| order.status == s)
            && self.payment_status.map_or(true, |s| order.payment_status == s)
            && self.user_id.map_or(true, |u| order.user_id == Some(u))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_orders: u64,
    pub by_status: BTreeMap<String, u64>,
    /// Sum of totals for paid orders that were not cancelled
    pub paid_revenue: Decimal,
    pub orders_today: u64,
}

impl OrderStats {
    /// Aggregate stats over `orders`; "today" is the UTC day of `now`.
    pub fn from_orders<'a>(orders: impl IntoIterator<Item = &'a Order>, now: DateTime<Utc>) -> Self {
        let mut stats = OrderStats::default();
        for status in OrderStatus::ALL {
            stats.by_status.insert(status.as_str().to_string(), 0);
        }

        let today = now.date_naive();
        for order in orders {
            stats.total_orders += 1;
            *stats
                .by_status
                .entry(order.status.as_str().to_string())
                .or_default() += 1;
            if order.payment_status == PaymentStatus::Paid && order.status != OrderStatus::Cancelled {
                stats.paid_revenue = stats.paid_revenue.saturating_add(order.total);
            }
            if order.created_at.date_naive() == today {
                stats.orders_today += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, price: i64) -> MenuItem {
        MenuItem::new(name, Decimal::new(price, 0), None)
    }

    #[test]
    fn test_price_order_totals() {
        let order_id = Uuid::new_v4();
        let lines = vec![(item("Jollof", 2500), 2), (item("Plantain", 800), 3)];

        let priced = price_order(order_id, &lines, Decimal::new(1000, 0)).unwrap();

        assert_eq!(priced.items.len(), 2);
        assert_eq!(priced.items[0].line_total, Decimal::new(5000, 0));
        assert_eq!(priced.items[1].line_total, Decimal::new(2400, 0));
        assert_eq!(priced.subtotal, Decimal::new(7400, 0));
        assert_eq!(priced.total, Decimal::new(8400, 0));
        assert!(priced.items.iter().all(|i| i.order_id == order_id));
    }

    #[test]
    fn test_fractional_prices() {
        let lines = vec![(MenuItem::new("Tea", Decimal::new(1050, 2), None), 3)];
        let priced = price_order(Uuid::new_v4(), &lines, Decimal::ZERO).unwrap();
        assert_eq!(priced.subtotal, Decimal::new(3150, 2));
    }

    #[test]
    fn test_price_overflow_is_reported() {
        let lines = vec![(MenuItem::new("Gold Plate", Decimal::MAX, None), 2)];
        assert!(price_order(Uuid::new_v4(), &lines, Decimal::ZERO).is_none());

        let lines = vec![(MenuItem::new("Gold Plate", Decimal::MAX, None), 1)];
        assert!(price_order(Uuid::new_v4(), &lines, Decimal::ONE).is_none());
    }

    #[test]
    fn test_delivery_flow_transitions() {
        use OrderStatus::*;
        let t = OrderType::Delivery;

        assert!(Pending.can_transition_to(Confirmed, t));
        assert!(Confirmed.can_transition_to(Preparing, t));
        assert!(Preparing.can_transition_to(Ready, t));
        assert!(Ready.can_transition_to(OutForDelivery, t));
        assert!(OutForDelivery.can_transition_to(Delivered, t));

        assert!(!Ready.can_transition_to(Delivered, t));
        assert!(!Pending.can_transition_to(Delivered, t));
        assert!(!Ready.can_transition_to(Cancelled, t));
    }

    #[test]
    fn test_pickup_flow_transitions() {
        use OrderStatus::*;
        let t = OrderType::Pickup;

        assert!(Ready.can_transition_to(Delivered, t));
        assert!(!Ready.can_transition_to(OutForDelivery, t));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for next in OrderStatus::ALL {
            assert!(!OrderStatus::Delivered.can_transition_to(next, OrderType::Delivery));
            assert!(!OrderStatus::Cancelled.can_transition_to(next, OrderType::Pickup));
        }
    }

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("out_for_delivery".parse::<OrderStatus>().unwrap(), OrderStatus::OutForDelivery);
        assert_eq!(OrderStatus::OutForDelivery.to_string(), "OUT_FOR_DELIVERY");
        assert!("shipped".parse::<OrderStatus>().is_err());
        assert_eq!(
            serde_json::to_value(PaymentStatus::Paid).unwrap(),
            serde_json::json!("PAID")
        );
    }

    #[test]
    fn test_generated_identifiers() {
        let now = Utc::now();
        let number = generate_order_number(now);
        assert!(number.starts_with(&format!("ORD-{}-", now.format("%Y%m%d"))));
        assert_eq!(number.len(), "ORD-YYYYMMDD-XXXXXX".len());

        let a = generate_payment_reference(now);
        let b = generate_payment_reference(now);
        assert!(a.starts_with("FOOD-"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_filter_pagination_bounds() {
        let filter = OrderFilter::default();
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.limit(), 20);
        assert_eq!(filter.offset(), 0);

        let filter = OrderFilter {
            page: 3,
            limit: 500,
            ..Default::default()
        };
        assert_eq!(filter.limit(), MAX_PAGE_SIZE);
        assert_eq!(filter.offset(), 200);

        let filter = OrderFilter {
            page: u32::MAX,
            limit: 100,
            ..Default::default()
        };
        assert_eq!(filter.offset(), u64::from(u32::MAX - 1) * 100);
    }
}
