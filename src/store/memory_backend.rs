//! In-memory store backend using DashMap.
//!
//! Data is lost on restart. Used for development and tests.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    Category, DeliveryArea, DeliveryLocation, MenuFilter, MenuItem, Order, OrderFilter,
    OrderStats, OrderStatus, RestaurantSettings, User,
};

use super::backend::{
    DeleteOutcome, DeliveryStore, MenuStore, OrderStore, PaymentUpdate, SettingsStore, Store,
    StoreError, StoreResult, UserStore,
};

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    /// email -> user id
    user_emails: DashMap<String, Uuid>,
    categories: DashMap<Uuid, Category>,
    menu_items: DashMap<Uuid, MenuItem>,
    locations: DashMap<Uuid, DeliveryLocation>,
    areas: DashMap<Uuid, DeliveryArea>,
    orders: DashMap<Uuid, Order>,
    settings: RwLock<Option<RestaurantSettings>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn order_references(&self, pred: impl Fn(&Order) -> bool) -> bool {
        self.orders.iter().any(|entry| pred(entry.value()))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: &User) -> StoreResult<()> {
        // Entry API holds the shard lock so two registrations cannot race
        match self.user_emails.entry(user.email.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::Conflict(
                "Email is already registered".to_string(),
            )),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.users.insert(user.id, user.clone());
                Ok(())
            }
        }
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<User> {
        self.users
            .get(&id)
            .map(|u| u.clone())
            .ok_or(StoreError::NotFound("User"))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .user_emails
            .get(email)
            .and_then(|id| self.users.get(&*id).map(|u| u.clone())))
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let mut existing = self.users.get_mut(&user.id).ok_or(StoreError::NotFound("User"))?;
        *existing = user.clone();
        existing.updated_at = Utc::now();
        Ok(())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }
}

#[async_trait]
impl MenuStore for MemoryStore {
    async fn list_categories(&self, include_inactive: bool) -> StoreResult<Vec<Category>> {
        let mut categories: Vec<Category> = self
            .categories
            .iter()
            .filter(|c| include_inactive || c.is_active)
            .map(|c| c.value().clone())
            .collect();
        categories.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        Ok(categories)
    }

    async fn get_category(&self, id: Uuid) -> StoreResult<Category> {
        self.categories
            .get(&id)
            .map(|c| c.clone())
            .ok_or(StoreError::NotFound("Category"))
    }

    async fn create_category(&self, category: &Category) -> StoreResult<()> {
        let taken = self
            .categories
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(&category.name));
        if taken {
            return Err(StoreError::Conflict(format!(
                "Category '{}' already exists",
                category.name
            )));
        }
        self.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> StoreResult<()> {
        let taken = self
            .categories
            .iter()
            .any(|c| c.id != category.id && c.name.eq_ignore_ascii_case(&category.name));
        if taken {
            return Err(StoreError::Conflict(format!(
                "Category '{}' already exists",
                category.name
            )));
        }
        let mut existing = self
            .categories
            .get_mut(&category.id)
            .ok_or(StoreError::NotFound("Category"))?;
        *existing = category.clone();
        existing.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_category(&self, id: Uuid) -> StoreResult<()> {
        if !self.categories.contains_key(&id) {
            return Err(StoreError::NotFound("Category"));
        }
        if self.menu_items.iter().any(|i| i.category_id == Some(id)) {
            return Err(StoreError::Conflict(
                "Category still has menu items".to_string(),
            ));
        }
        self.categories.remove(&id);
        Ok(())
    }

    async fn list_menu_items(&self, filter: &MenuFilter) -> StoreResult<Vec<MenuItem>> {
        let sort_orders: std::collections::HashMap<Uuid, i32> = self
            .categories
            .iter()
            .map(|c| (c.id, c.sort_order))
            .collect();

        let mut items: Vec<MenuItem> = self
            .menu_items
            .iter()
            .filter(|i| filter.matches(i.value()))
            .map(|i| i.value().clone())
            .collect();

        let rank = |item: &MenuItem| {
            item.category_id
                .and_then(|c| sort_orders.get(&c).copied())
                .unwrap_or(i32::MAX)
        };
        items.sort_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name)));
        Ok(items)
    }

    async fn get_menu_item(&self, id: Uuid) -> StoreResult<MenuItem> {
        self.menu_items
            .get(&id)
            .map(|i| i.clone())
            .ok_or(StoreError::NotFound("Menu item"))
    }

    async fn get_menu_items(&self, ids: &[Uuid]) -> StoreResult<Vec<MenuItem>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.menu_items.get(id).map(|i| i.clone()))
            .collect())
    }

    async fn create_menu_item(&self, item: &MenuItem) -> StoreResult<()> {
        self.menu_items.insert(item.id, item.clone());
        Ok(())
    }

    async fn update_menu_item(&self, item: &MenuItem) -> StoreResult<()> {
        let mut existing = self
            .menu_items
            .get_mut(&item.id)
            .ok_or(StoreError::NotFound("Menu item"))?;
        *existing = item.clone();
        existing.updated_at = Utc::now();
        Ok(())
    }

    async fn set_menu_item_availability(&self, id: Uuid, available: bool) -> StoreResult<MenuItem> {
        let mut existing = self
            .menu_items
            .get_mut(&id)
            .ok_or(StoreError::NotFound("Menu item"))?;
        existing.available = available;
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn delete_menu_item(&self, id: Uuid) -> StoreResult<DeleteOutcome> {
        if !self.menu_items.contains_key(&id) {
            return Err(StoreError::NotFound("Menu item"));
        }
        if self.order_references(|o| o.items.iter().any(|i| i.menu_item_id == id)) {
            self.set_menu_item_availability(id, false).await?;
            return Ok(DeleteOutcome::Disabled);
        }
        self.menu_items.remove(&id);
        Ok(DeleteOutcome::Deleted)
    }
}

#[async_trait]
impl DeliveryStore for MemoryStore {
    async fn list_locations(&self, include_inactive: bool) -> StoreResult<Vec<DeliveryLocation>> {
        let mut locations: Vec<DeliveryLocation> = self
            .locations
            .iter()
            .filter(|l| include_inactive || l.is_active)
            .map(|l| l.value().clone())
            .collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(locations)
    }

    async fn get_location(&self, id: Uuid) -> StoreResult<DeliveryLocation> {
        self.locations
            .get(&id)
            .map(|l| l.clone())
            .ok_or(StoreError::NotFound("Delivery location"))
    }

    async fn create_location(&self, location: &DeliveryLocation) -> StoreResult<()> {
        let taken = self
            .locations
            .iter()
            .any(|l| l.name.eq_ignore_ascii_case(&location.name));
        if taken {
            return Err(StoreError::Conflict(format!(
                "Delivery location '{}' already exists",
                location.name
            )));
        }
        self.locations.insert(location.id, location.clone());
        Ok(())
    }

    async fn update_location(&self, location: &DeliveryLocation) -> StoreResult<()> {
        let taken = self
            .locations
            .iter()
            .any(|l| l.id != location.id && l.name.eq_ignore_ascii_case(&location.name));
        if taken {
            return Err(StoreError::Conflict(format!(
                "Delivery location '{}' already exists",
                location.name
            )));
        }
        let mut existing = self
            .locations
            .get_mut(&location.id)
            .ok_or(StoreError::NotFound("Delivery location"))?;
        *existing = location.clone();
        existing.updated_at = Utc::now();
        Ok(())
    }

    async fn set_location_active(&self, id: Uuid, is_active: bool) -> StoreResult<DeliveryLocation> {
        let mut existing = self
            .locations
            .get_mut(&id)
            .ok_or(StoreError::NotFound("Delivery location"))?;
        existing.is_active = is_active;
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn delete_location(&self, id: Uuid) -> StoreResult<DeleteOutcome> {
        if !self.locations.contains_key(&id) {
            return Err(StoreError::NotFound("Delivery location"));
        }
        if self.order_references(|o| o.delivery_location_id == Some(id)) {
            self.set_location_active(id, false).await?;
            return Ok(DeleteOutcome::Disabled);
        }
        self.areas.retain(|_, a| a.location_id != id);
        self.locations.remove(&id);
        Ok(DeleteOutcome::Deleted)
    }

    async fn list_areas(&self, location_id: Uuid, include_inactive: bool) -> StoreResult<Vec<DeliveryArea>> {
        let mut areas: Vec<DeliveryArea> = self
            .areas
            .iter()
            .filter(|a| a.location_id == location_id && (include_inactive || a.is_active))
            .map(|a| a.value().clone())
            .collect();
        areas.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(areas)
    }

    async fn get_area(&self, id: Uuid) -> StoreResult<DeliveryArea> {
        self.areas
            .get(&id)
            .map(|a| a.clone())
            .ok_or(StoreError::NotFound("Delivery area"))
    }

    async fn create_area(&self, area: &DeliveryArea) -> StoreResult<()> {
        if !self.locations.contains_key(&area.location_id) {
            return Err(StoreError::NotFound("Delivery location"));
        }
        self.areas.insert(area.id, area.clone());
        Ok(())
    }

    async fn update_area(&self, area: &DeliveryArea) -> StoreResult<()> {
        let mut existing = self
            .areas
            .get_mut(&area.id)
            .ok_or(StoreError::NotFound("Delivery area"))?;
        *existing = area.clone();
        existing.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_area(&self, id: Uuid) -> StoreResult<DeleteOutcome> {
        if !self.areas.contains_key(&id) {
            return Err(StoreError::NotFound("Delivery area"));
        }
        if self.order_references(|o| o.delivery_area_id == Some(id)) {
            if let Some(mut area) = self.areas.get_mut(&id) {
                area.is_active = false;
                area.updated_at = Utc::now();
            }
            return Ok(DeleteOutcome::Disabled);
        }
        self.areas.remove(&id);
        Ok(DeleteOutcome::Deleted)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(&self, order: &Order) -> StoreResult<()> {
        if let Some(ref reference) = order.payment_reference {
            if self.order_references(|o| o.payment_reference.as_ref() == Some(reference)) {
                return Err(StoreError::Conflict("Duplicate payment reference".to_string()));
            }
        }
        if self.order_references(|o| o.order_number == order.order_number) {
            return Err(StoreError::Conflict("Duplicate order number".to_string()));
        }
        self.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Order> {
        self.orders
            .get(&id)
            .map(|o| o.clone())
            .ok_or(StoreError::NotFound("Order"))
    }

    async fn find_order_by_number(&self, order_number: &str) -> StoreResult<Option<Order>> {
        Ok(self
            .orders
            .iter()
            .find(|o| o.order_number == order_number)
            .map(|o| o.value().clone()))
    }

    async fn find_order_by_payment_reference(&self, reference: &str) -> StoreResult<Option<Order>> {
        Ok(self
            .orders
            .iter()
            .find(|o| o.payment_reference.as_deref() == Some(reference))
            .map(|o| o.value().clone()))
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<(Vec<Order>, u64)> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| filter.matches(o.value()))
            .map(|o| o.value().clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = orders.len() as u64;
        let page = orders
            .into_iter()
            .skip(usize::try_from(filter.offset()).unwrap_or(usize::MAX))
            .take(filter.limit() as usize)
            .collect();
        Ok((page, total))
    }

    async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> StoreResult<Order> {
        let mut order = self.orders.get_mut(&id).ok_or(StoreError::NotFound("Order"))?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn update_payment(&self, id: Uuid, update: &PaymentUpdate) -> StoreResult<Order> {
        let mut order = self.orders.get_mut(&id).ok_or(StoreError::NotFound("Order"))?;
        order.payment_status = update.payment_status;
        if update.transaction_reference.is_some() {
            order.transaction_reference = update.transaction_reference.clone();
        }
        if update.paid_at.is_some() {
            order.paid_at = update.paid_at;
        }
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn order_stats(&self) -> StoreResult<OrderStats> {
        let orders: Vec<Order> = self.orders.iter().map(|o| o.value().clone()).collect();
        Ok(OrderStats::from_orders(&orders, Utc::now()))
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get_settings(&self) -> StoreResult<Option<RestaurantSettings>> {
        Ok(self.settings.read().await.clone())
    }

    async fn save_settings(&self, settings: &RestaurantSettings) -> StoreResult<()> {
        *self.settings.write().await = Some(settings.clone());
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend_type(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> bool {
        true
    }
}
