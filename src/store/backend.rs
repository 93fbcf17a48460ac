//! Storage traits.
//!
//! Each resource gets its own trait so handlers depend only on what they use.
//! Backends (PostgreSQL, in-memory) implement all of them and are handed out
//! as `Arc<dyn Store>`.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    Category, DeliveryArea, DeliveryLocation, MenuFilter, MenuItem, Order, OrderFilter,
    OrderStats, OrderStatus, PaymentStatus, RestaurantSettings, User,
};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Row does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Unique constraint or referential conflict
    #[error("{0}")]
    Conflict(String),

    /// PostgreSQL operation failed
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Stored value could not be decoded into a domain type
    #[error("Corrupt row: {0}")]
    Decode(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a delete that may degrade to a soft-disable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Row was removed
    Deleted,
    /// Row is referenced by orders and was disabled instead
    Disabled,
}

/// Payment fields written when reconciling a gateway transaction.
#[derive(Debug, Clone)]
pub struct PaymentUpdate {
    pub payment_status: PaymentStatus,
    pub transaction_reference: Option<String>,
    pub paid_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: &User) -> StoreResult<()>;
    async fn get_user(&self, id: Uuid) -> StoreResult<User>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn update_user(&self, user: &User) -> StoreResult<()>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
}

#[async_trait]
pub trait MenuStore: Send + Sync {
    async fn list_categories(&self, include_inactive: bool) -> StoreResult<Vec<Category>>;
    async fn get_category(&self, id: Uuid) -> StoreResult<Category>;
    async fn create_category(&self, category: &Category) -> StoreResult<()>;
    async fn update_category(&self, category: &Category) -> StoreResult<()>;
    /// Fails with `Conflict` while menu items still reference the category.
    async fn delete_category(&self, id: Uuid) -> StoreResult<()>;

    async fn list_menu_items(&self, filter: &MenuFilter) -> StoreResult<Vec<MenuItem>>;
    async fn get_menu_item(&self, id: Uuid) -> StoreResult<MenuItem>;
    /// Fetch several items at once; missing ids are simply absent from the result.
    async fn get_menu_items(&self, ids: &[Uuid]) -> StoreResult<Vec<MenuItem>>;
    async fn create_menu_item(&self, item: &MenuItem) -> StoreResult<()>;
    async fn update_menu_item(&self, item: &MenuItem) -> StoreResult<()>;
    async fn set_menu_item_availability(&self, id: Uuid, available: bool) -> StoreResult<MenuItem>;
    async fn delete_menu_item(&self, id: Uuid) -> StoreResult<DeleteOutcome>;
}

#[async_trait]
pub trait DeliveryStore: Send + Sync {
    async fn list_locations(&self, include_inactive: bool) -> StoreResult<Vec<DeliveryLocation>>;
    async fn get_location(&self, id: Uuid) -> StoreResult<DeliveryLocation>;
    async fn create_location(&self, location: &DeliveryLocation) -> StoreResult<()>;
    async fn update_location(&self, location: &DeliveryLocation) -> StoreResult<()>;
    async fn set_location_active(&self, id: Uuid, is_active: bool) -> StoreResult<DeliveryLocation>;
    async fn delete_location(&self, id: Uuid) -> StoreResult<DeleteOutcome>;

    async fn list_areas(&self, location_id: Uuid, include_inactive: bool) -> StoreResult<Vec<DeliveryArea>>;
    async fn get_area(&self, id: Uuid) -> StoreResult<DeliveryArea>;
    async fn create_area(&self, area: &DeliveryArea) -> StoreResult<()>;
    async fn update_area(&self, area: &DeliveryArea) -> StoreResult<()>;
    async fn delete_area(&self, id: Uuid) -> StoreResult<DeleteOutcome>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert the order and its items atomically.
    async fn create_order(&self, order: &Order) -> StoreResult<()>;
    async fn get_order(&self, id: Uuid) -> StoreResult<Order>;
    async fn find_order_by_number(&self, order_number: &str) -> StoreResult<Option<Order>>;
    async fn find_order_by_payment_reference(&self, reference: &str) -> StoreResult<Option<Order>>;
    /// Returns the page and the total count matching the filter, newest first.
    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<(Vec<Order>, u64)>;
    async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> StoreResult<Order>;
    async fn update_payment(&self, id: Uuid, update: &PaymentUpdate) -> StoreResult<Order>;
    async fn order_stats(&self) -> StoreResult<OrderStats>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// `None` when settings were never saved
    async fn get_settings(&self) -> StoreResult<Option<RestaurantSettings>>;
    async fn save_settings(&self, settings: &RestaurantSettings) -> StoreResult<()>;
}

/// Everything a backend provides.
#[async_trait]
pub trait Store: UserStore + MenuStore + DeliveryStore + OrderStore + SettingsStore {
    /// Backend type identifier
    fn backend_type(&self) -> &'static str;

    /// Cheap liveness probe for health checks
    async fn ping(&self) -> bool;
}
