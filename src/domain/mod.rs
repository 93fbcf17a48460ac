//! Domain layer modules
//!
//! Entities and the pure business rules around them:
//! - `user`: accounts and roles
//! - `menu`: categories and menu items
//! - `delivery`: delivery locations and their areas
//! - `order`: orders, line items, pricing and status transitions
//! - `settings`: restaurant-wide settings

pub mod delivery;
pub mod menu;
pub mod order;
pub mod settings;
pub mod user;

pub use delivery::{DeliveryArea, DeliveryLocation};
pub use menu::{Category, MenuFilter, MenuItem, MAX_AMOUNT};
pub use order::{
    generate_order_number, generate_payment_reference, price_order, Order, OrderFilter, OrderItem,
    OrderStats, OrderStatus, OrderType, PaymentMethod, PaymentStatus, PricedOrder,
};
pub use settings::{RestaurantSettings, SettingsUpdate};
pub use user::{Role, User};
