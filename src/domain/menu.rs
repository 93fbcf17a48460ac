use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Largest accepted menu price or delivery fee, in whole currency units
pub const MAX_AMOUNT: i64 = 10_000_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(name: impl Into<String>, description: Option<String>, sort_order: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description,
            sort_order,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub available: bool,
    pub preparation_time_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MenuItem {
    pub fn new(name: impl Into<String>, price: Decimal, category_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            price,
            image_url: None,
            category_id,
            available: true,
            preparation_time_minutes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Query filter for menu listings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuFilter {
    #[serde(alias = "category_id")]
    pub category_id: Option<Uuid>,
    pub available: Option<bool>,
    pub search: Option<String>,
}

impl MenuFilter {
    pub fn matches(&self, item: &MenuItem) -> bool {
        if let Some(category_id) = self.category_id {
            if item.category_id != Some(category_id) {
                return false;
            }
        }
        if let Some(available) = self.available {
            if item.available != available {
                return false;
            }
        }
        match self.search_term() {
            Some(term) => item.name.to_lowercase().contains(&term),
            None => true,
        }
    }

    /// Lower-cased, trimmed search term; `None` when blank
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}
