//! PostgreSQL store backend.
//!
//! Enum columns are stored as TEXT and decoded through the domain `FromStr`
//! impls; money columns are `NUMERIC(12,2)` mapped to `rust_decimal::Decimal`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::{
    Category, DeliveryArea, DeliveryLocation, MenuFilter, MenuItem, Order, OrderFilter,
    OrderItem, OrderStats, OrderStatus, RestaurantSettings, User,
};

use super::backend::{
    DeleteOutcome, DeliveryStore, MenuStore, OrderStore, PaymentUpdate, SettingsStore, Store,
    StoreError, StoreResult, UserStore,
};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, sql: &str, id: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(sql).bind(id).fetch_one(&self.pool).await?;
        Ok(exists)
    }

    async fn load_items(&self, order_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<OrderItem>>> {
        let rows: Vec<OrderItemRow> = sqlx::query_as(
            r#"
            SELECT id, order_id, menu_item_id, name, unit_price, quantity, line_total
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY name
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            grouped.entry(row.order_id).or_default().push(row.into());
        }
        Ok(grouped)
    }

    async fn hydrate(&self, rows: Vec<OrderRow>) -> StoreResult<Vec<Order>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = self.load_items(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let order_items = items.remove(&row.id).unwrap_or_default();
                row.into_order(order_items)
            })
            .collect()
    }

    async fn fetch_order_where(&self, column: &str, value: &str) -> StoreResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE {} = $1", ORDER_COLUMNS, column);
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Postgres`.
fn conflict_on_unique(err: sqlx::Error, message: impl Into<String>) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(message.into()),
        _ => StoreError::Postgres(err),
    }
}

fn decode<T: std::str::FromStr<Err = String>>(value: &str) -> StoreResult<T> {
    value.parse().map_err(StoreError::Decode)
}

// =============================================================================
// Row types
// =============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    password_hash: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> StoreResult<Self> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            password_hash: row.password_hash,
            role: decode(&row.role)?,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    sort_order: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            description: row.description,
            sort_order: row.sort_order,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MenuItemRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    price: Decimal,
    image_url: Option<String>,
    category_id: Option<Uuid>,
    available: bool,
    preparation_time_minutes: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MenuItemRow> for MenuItem {
    fn from(row: MenuItemRow) -> Self {
        MenuItem {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            image_url: row.image_url,
            category_id: row.category_id,
            available: row.available,
            preparation_time_minutes: row.preparation_time_minutes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LocationRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    delivery_fee: Decimal,
    estimated_minutes: Option<i32>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LocationRow> for DeliveryLocation {
    fn from(row: LocationRow) -> Self {
        DeliveryLocation {
            id: row.id,
            name: row.name,
            description: row.description,
            delivery_fee: row.delivery_fee,
            estimated_minutes: row.estimated_minutes,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AreaRow {
    id: Uuid,
    location_id: Uuid,
    name: String,
    additional_fee: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AreaRow> for DeliveryArea {
    fn from(row: AreaRow) -> Self {
        DeliveryArea {
            id: row.id,
            location_id: row.location_id,
            name: row.name,
            additional_fee: row.additional_fee,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const ORDER_COLUMNS: &str = "id, order_number, user_id, customer_name, customer_email, \
    customer_phone, order_type, delivery_location_id, delivery_area_id, delivery_address, notes, \
    subtotal, delivery_fee, total, status, payment_method, payment_status, payment_reference, \
    transaction_reference, paid_at, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Option<Uuid>,
    customer_name: String,
    customer_email: Option<String>,
    customer_phone: String,
    order_type: String,
    delivery_location_id: Option<Uuid>,
    delivery_area_id: Option<Uuid>,
    delivery_address: Option<String>,
    notes: Option<String>,
    subtotal: Decimal,
    delivery_fee: Decimal,
    total: Decimal,
    status: String,
    payment_method: String,
    payment_status: String,
    payment_reference: Option<String>,
    transaction_reference: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> StoreResult<Order> {
        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            order_type: decode(&self.order_type)?,
            delivery_location_id: self.delivery_location_id,
            delivery_area_id: self.delivery_area_id,
            delivery_address: self.delivery_address,
            notes: self.notes,
            subtotal: self.subtotal,
            delivery_fee: self.delivery_fee,
            total: self.total,
            status: decode(&self.status)?,
            payment_method: decode(&self.payment_method)?,
            payment_status: decode(&self.payment_status)?,
            payment_reference: self.payment_reference,
            transaction_reference: self.transaction_reference,
            paid_at: self.paid_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    menu_item_id: Uuid,
    name: String,
    unit_price: Decimal,
    quantity: i32,
    line_total: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            menu_item_id: row.menu_item_id,
            name: row.name,
            unit_price: row.unit_price,
            quantity: row.quantity,
            line_total: row.line_total,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SettingsRow {
    restaurant_name: String,
    contact_phone: Option<String>,
    contact_email: Option<String>,
    address: Option<String>,
    is_open: bool,
    accepting_orders: bool,
    minimum_order_amount: Decimal,
    pickup_enabled: bool,
    delivery_enabled: bool,
    opening_time: Option<NaiveTime>,
    closing_time: Option<NaiveTime>,
    currency: String,
    updated_at: DateTime<Utc>,
}

impl From<SettingsRow> for RestaurantSettings {
    fn from(row: SettingsRow) -> Self {
        RestaurantSettings {
            restaurant_name: row.restaurant_name,
            contact_phone: row.contact_phone,
            contact_email: row.contact_email,
            address: row.address,
            is_open: row.is_open,
            accepting_orders: row.accepting_orders,
            minimum_order_amount: row.minimum_order_amount,
            pickup_enabled: row.pickup_enabled,
            delivery_enabled: row.delivery_enabled,
            opening_time: row.opening_time,
            closing_time: row.closing_time,
            currency: row.currency,
            updated_at: row.updated_at,
        }
    }
}

// =============================================================================
// Users
// =============================================================================

const USER_COLUMNS: &str =
    "id, name, email, phone, password_hash, role, is_active, created_at, updated_at";

#[async_trait]
impl UserStore for PostgresStore {
    async fn create_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, phone, password_hash, role, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Email is already registered"))?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<User> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.ok_or(StoreError::NotFound("User"))?.try_into()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&sql).bind(email).fetch_optional(&self.pool).await?;
        row.map(User::try_from).transpose()
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = $2, phone = $3, password_hash = $4, role = $5, is_active = $6, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("User"));
        }
        Ok(())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {} FROM users ORDER BY created_at DESC", USER_COLUMNS);
        let rows: Vec<UserRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(User::try_from).collect()
    }
}

// =============================================================================
// Menu
// =============================================================================

const MENU_COLUMNS: &str = "m.id, m.name, m.description, m.price, m.image_url, m.category_id, \
    m.available, m.preparation_time_minutes, m.created_at, m.updated_at";

#[async_trait]
impl MenuStore for PostgresStore {
    async fn list_categories(&self, include_inactive: bool) -> StoreResult<Vec<Category>> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, sort_order, is_active, created_at, updated_at
            FROM categories
            WHERE $1 OR is_active
            ORDER BY sort_order, name
            "#,
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn get_category(&self, id: Uuid) -> StoreResult<Category> {
        let row: Option<CategoryRow> = sqlx::query_as(
            "SELECT id, name, description, sort_order, is_active, created_at, updated_at FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Category::from).ok_or(StoreError::NotFound("Category"))
    }

    async fn create_category(&self, category: &Category) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, sort_order, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.sort_order)
        .bind(category.is_active)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, format!("Category '{}' already exists", category.name)))?;
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE categories
            SET name = $2, description = $3, sort_order = $4, is_active = $5, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.sort_order)
        .bind(category.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, format!("Category '{}' already exists", category.name)))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Category"));
        }
        Ok(())
    }

    async fn delete_category(&self, id: Uuid) -> StoreResult<()> {
        if self
            .exists("SELECT EXISTS(SELECT 1 FROM menu_items WHERE category_id = $1)", id)
            .await?
        {
            return Err(StoreError::Conflict("Category still has menu items".to_string()));
        }

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Category"));
        }
        Ok(())
    }

    async fn list_menu_items(&self, filter: &MenuFilter) -> StoreResult<Vec<MenuItem>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM menu_items m LEFT JOIN categories c ON c.id = m.category_id WHERE TRUE",
            MENU_COLUMNS
        ));

        if let Some(category_id) = filter.category_id {
            qb.push(" AND m.category_id = ").push_bind(category_id);
        }
        if let Some(available) = filter.available {
            qb.push(" AND m.available = ").push_bind(available);
        }
        if let Some(term) = filter.search_term() {
            qb.push(" AND m.name ILIKE ").push_bind(format!("%{}%", term));
        }
        qb.push(" ORDER BY COALESCE(c.sort_order, 2147483647), m.name");

        let rows: Vec<MenuItemRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(MenuItem::from).collect())
    }

    async fn get_menu_item(&self, id: Uuid) -> StoreResult<MenuItem> {
        let sql = format!("SELECT {} FROM menu_items m WHERE m.id = $1", MENU_COLUMNS);
        let row: Option<MenuItemRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(MenuItem::from).ok_or(StoreError::NotFound("Menu item"))
    }

    async fn get_menu_items(&self, ids: &[Uuid]) -> StoreResult<Vec<MenuItem>> {
        let sql = format!("SELECT {} FROM menu_items m WHERE m.id = ANY($1)", MENU_COLUMNS);
        let rows: Vec<MenuItemRow> = sqlx::query_as(&sql).bind(ids).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(MenuItem::from).collect())
    }

    async fn create_menu_item(&self, item: &MenuItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO menu_items (
                id, name, description, price, image_url, category_id,
                available, preparation_time_minutes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price)
        .bind(&item.image_url)
        .bind(item.category_id)
        .bind(item.available)
        .bind(item.preparation_time_minutes)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_menu_item(&self, item: &MenuItem) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE menu_items
            SET name = $2, description = $3, price = $4, image_url = $5, category_id = $6,
                available = $7, preparation_time_minutes = $8, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price)
        .bind(&item.image_url)
        .bind(item.category_id)
        .bind(item.available)
        .bind(item.preparation_time_minutes)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Menu item"));
        }
        Ok(())
    }

    async fn set_menu_item_availability(&self, id: Uuid, available: bool) -> StoreResult<MenuItem> {
        let sql = format!(
            "UPDATE menu_items m SET available = $2, updated_at = NOW() WHERE m.id = $1 RETURNING {}",
            MENU_COLUMNS
        );
        let row: Option<MenuItemRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(available)
            .fetch_optional(&self.pool)
            .await?;
        row.map(MenuItem::from).ok_or(StoreError::NotFound("Menu item"))
    }

    async fn delete_menu_item(&self, id: Uuid) -> StoreResult<DeleteOutcome> {
        if self
            .exists("SELECT EXISTS(SELECT 1 FROM order_items WHERE menu_item_id = $1)", id)
            .await?
        {
            self.set_menu_item_availability(id, false).await?;
            return Ok(DeleteOutcome::Disabled);
        }

        let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Menu item"));
        }
        Ok(DeleteOutcome::Deleted)
    }
}

// =============================================================================
// Delivery
// =============================================================================

const LOCATION_COLUMNS: &str =
    "id, name, description, delivery_fee, estimated_minutes, is_active, created_at, updated_at";
const AREA_COLUMNS: &str =
    "id, location_id, name, additional_fee, is_active, created_at, updated_at";

#[async_trait]
impl DeliveryStore for PostgresStore {
    async fn list_locations(&self, include_inactive: bool) -> StoreResult<Vec<DeliveryLocation>> {
        let sql = format!(
            "SELECT {} FROM delivery_locations WHERE $1 OR is_active ORDER BY name",
            LOCATION_COLUMNS
        );
        let rows: Vec<LocationRow> = sqlx::query_as(&sql)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(DeliveryLocation::from).collect())
    }

    async fn get_location(&self, id: Uuid) -> StoreResult<DeliveryLocation> {
        let sql = format!("SELECT {} FROM delivery_locations WHERE id = $1", LOCATION_COLUMNS);
        let row: Option<LocationRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(DeliveryLocation::from)
            .ok_or(StoreError::NotFound("Delivery location"))
    }

    async fn create_location(&self, location: &DeliveryLocation) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO delivery_locations (
                id, name, description, delivery_fee, estimated_minutes, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(location.id)
        .bind(&location.name)
        .bind(&location.description)
        .bind(location.delivery_fee)
        .bind(location.estimated_minutes)
        .bind(location.is_active)
        .bind(location.created_at)
        .bind(location.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            conflict_on_unique(e, format!("Delivery location '{}' already exists", location.name))
        })?;
        Ok(())
    }

    async fn update_location(&self, location: &DeliveryLocation) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE delivery_locations
            SET name = $2, description = $3, delivery_fee = $4, estimated_minutes = $5,
                is_active = $6, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(location.id)
        .bind(&location.name)
        .bind(&location.description)
        .bind(location.delivery_fee)
        .bind(location.estimated_minutes)
        .bind(location.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            conflict_on_unique(e, format!("Delivery location '{}' already exists", location.name))
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Delivery location"));
        }
        Ok(())
    }

    async fn set_location_active(&self, id: Uuid, is_active: bool) -> StoreResult<DeliveryLocation> {
        let sql = format!(
            "UPDATE delivery_locations SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            LOCATION_COLUMNS
        );
        let row: Option<LocationRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(is_active)
            .fetch_optional(&self.pool)
            .await?;
        row.map(DeliveryLocation::from)
            .ok_or(StoreError::NotFound("Delivery location"))
    }

    async fn delete_location(&self, id: Uuid) -> StoreResult<DeleteOutcome> {
        if self
            .exists("SELECT EXISTS(SELECT 1 FROM orders WHERE delivery_location_id = $1)", id)
            .await?
        {
            self.set_location_active(id, false).await?;
            return Ok(DeleteOutcome::Disabled);
        }

        // Areas go with the location (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM delivery_locations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Delivery location"));
        }
        Ok(DeleteOutcome::Deleted)
    }

    async fn list_areas(&self, location_id: Uuid, include_inactive: bool) -> StoreResult<Vec<DeliveryArea>> {
        let sql = format!(
            "SELECT {} FROM delivery_areas WHERE location_id = $1 AND ($2 OR is_active) ORDER BY name",
            AREA_COLUMNS
        );
        let rows: Vec<AreaRow> = sqlx::query_as(&sql)
            .bind(location_id)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(DeliveryArea::from).collect())
    }

    async fn get_area(&self, id: Uuid) -> StoreResult<DeliveryArea> {
        let sql = format!("SELECT {} FROM delivery_areas WHERE id = $1", AREA_COLUMNS);
        let row: Option<AreaRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(DeliveryArea::from)
            .ok_or(StoreError::NotFound("Delivery area"))
    }

    async fn create_area(&self, area: &DeliveryArea) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO delivery_areas (id, location_id, name, additional_fee, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(area.id)
        .bind(area.location_id)
        .bind(&area.name)
        .bind(area.additional_fee)
        .bind(area.is_active)
        .bind(area.created_at)
        .bind(area.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Err(StoreError::NotFound("Delivery location"))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_area(&self, area: &DeliveryArea) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE delivery_areas
            SET name = $2, additional_fee = $3, is_active = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(area.id)
        .bind(&area.name)
        .bind(area.additional_fee)
        .bind(area.is_active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Delivery area"));
        }
        Ok(())
    }

    async fn delete_area(&self, id: Uuid) -> StoreResult<DeleteOutcome> {
        if self
            .exists("SELECT EXISTS(SELECT 1 FROM orders WHERE delivery_area_id = $1)", id)
            .await?
        {
            let result = sqlx::query(
                "UPDATE delivery_areas SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
            )
            .bind(id)
            .execute(&self.pool)
            .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound("Delivery area"));
            }
            return Ok(DeleteOutcome::Disabled);
        }

        let result = sqlx::query("DELETE FROM delivery_areas WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Delivery area"));
        }
        Ok(DeleteOutcome::Deleted)
    }
}

// =============================================================================
// Orders
// =============================================================================

fn push_order_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(payment_status) = filter.payment_status {
        qb.push(" AND payment_status = ").push_bind(payment_status.as_str());
    }
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn create_order(&self, order: &Order) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, user_id, customer_name, customer_email, customer_phone,
                order_type, delivery_location_id, delivery_area_id, delivery_address, notes,
                subtotal, delivery_fee, total, status, payment_method, payment_status,
                payment_reference, transaction_reference, paid_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
            "#,
        )
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.user_id)
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(&order.customer_phone)
        .bind(order.order_type.as_str())
        .bind(order.delivery_location_id)
        .bind(order.delivery_area_id)
        .bind(&order.delivery_address)
        .bind(&order.notes)
        .bind(order.subtotal)
        .bind(order.delivery_fee)
        .bind(order.total)
        .bind(order.status.as_str())
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(&order.payment_reference)
        .bind(&order.transaction_reference)
        .bind(order.paid_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "Duplicate order number or payment reference"))?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, menu_item_id, name, unit_price, quantity, line_total)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.id)
            .bind(order.id)
            .bind(item.menu_item_id)
            .bind(&item.name)
            .bind(item.unit_price)
            .bind(item.quantity)
            .bind(item.line_total)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Order> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
        let row: Option<OrderRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        let row = row.ok_or(StoreError::NotFound("Order"))?;
        self.hydrate(vec![row])
            .await?
            .pop()
            .ok_or(StoreError::NotFound("Order"))
    }

    async fn find_order_by_number(&self, order_number: &str) -> StoreResult<Option<Order>> {
        self.fetch_order_where("order_number", order_number).await
    }

    async fn find_order_by_payment_reference(&self, reference: &str) -> StoreResult<Option<Order>> {
        self.fetch_order_where("payment_reference", reference).await
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<(Vec<Order>, u64)> {
        let mut count_qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM orders WHERE TRUE");
        push_order_filter(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM orders WHERE TRUE", ORDER_COLUMNS));
        push_order_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.limit() as i64)
            .push(" OFFSET ")
            .push_bind(i64::try_from(filter.offset()).unwrap_or(i64::MAX));

        let rows: Vec<OrderRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        let orders = self.hydrate(rows).await?;
        Ok((orders, total.max(0) as u64))
    }

    async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> StoreResult<Order> {
        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Order"));
        }
        self.get_order(id).await
    }

    async fn update_payment(&self, id: Uuid, update: &PaymentUpdate) -> StoreResult<Order> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET payment_status = $2,
                transaction_reference = COALESCE($3, transaction_reference),
                paid_at = COALESCE($4, paid_at),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(update.payment_status.as_str())
        .bind(&update.transaction_reference)
        .bind(update.paid_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Order"));
        }
        self.get_order(id).await
    }

    async fn order_stats(&self) -> StoreResult<OrderStats> {
        let now = Utc::now();
        let mut stats = OrderStats::from_orders(std::iter::empty::<&Order>(), now);

        let counts: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status")
                .fetch_all(&self.pool)
                .await?;
        for (status, count) in counts {
            stats.total_orders += count as u64;
            stats.by_status.insert(status, count as u64);
        }

        stats.paid_revenue = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total), 0) FROM orders WHERE payment_status = 'PAID' AND status <> 'CANCELLED'",
        )
        .fetch_one(&self.pool)
        .await?;

        let start_of_day = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc())
            .unwrap_or(now);
        let today: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE created_at >= $1")
            .bind(start_of_day)
            .fetch_one(&self.pool)
            .await?;
        stats.orders_today = today.max(0) as u64;

        Ok(stats)
    }
}

// =============================================================================
// Settings
// =============================================================================

#[async_trait]
impl SettingsStore for PostgresStore {
    async fn get_settings(&self) -> StoreResult<Option<RestaurantSettings>> {
        let row: Option<SettingsRow> = sqlx::query_as(
            r#"
            SELECT restaurant_name, contact_phone, contact_email, address, is_open, accepting_orders,
                   minimum_order_amount, pickup_enabled, delivery_enabled, opening_time, closing_time,
                   currency, updated_at
            FROM settings
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RestaurantSettings::from))
    }

    async fn save_settings(&self, settings: &RestaurantSettings) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (
                id, restaurant_name, contact_phone, contact_email, address, is_open, accepting_orders,
                minimum_order_amount, pickup_enabled, delivery_enabled, opening_time, closing_time,
                currency, updated_at
            )
            VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                restaurant_name = EXCLUDED.restaurant_name,
                contact_phone = EXCLUDED.contact_phone,
                contact_email = EXCLUDED.contact_email,
                address = EXCLUDED.address,
                is_open = EXCLUDED.is_open,
                accepting_orders = EXCLUDED.accepting_orders,
                minimum_order_amount = EXCLUDED.minimum_order_amount,
                pickup_enabled = EXCLUDED.pickup_enabled,
                delivery_enabled = EXCLUDED.delivery_enabled,
                opening_time = EXCLUDED.opening_time,
                closing_time = EXCLUDED.closing_time,
                currency = EXCLUDED.currency,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&settings.restaurant_name)
        .bind(&settings.contact_phone)
        .bind(&settings.contact_email)
        .bind(&settings.address)
        .bind(settings.is_open)
        .bind(settings.accepting_orders)
        .bind(settings.minimum_order_amount)
        .bind(settings.pickup_enabled)
        .bind(settings.delivery_enabled)
        .bind(settings.opening_time)
        .bind(settings.closing_time)
        .bind(&settings.currency)
        .bind(settings.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    fn backend_type(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}
