use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Restaurant-wide settings. Stored as a single row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantSettings {
    pub restaurant_name: String,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub address: Option<String>,
    pub is_open: bool,
    pub accepting_orders: bool,
    pub minimum_order_amount: Decimal,
    pub pickup_enabled: bool,
    pub delivery_enabled: bool,
    pub opening_time: Option<NaiveTime>,
    pub closing_time: Option<NaiveTime>,
    pub currency: String,
    pub updated_at: DateTime<Utc>,
}

impl Default for RestaurantSettings {
    fn default() -> Self {
        Self {
            restaurant_name: "Restaurant".to_string(),
            contact_phone: None,
            contact_email: None,
            address: None,
            is_open: true,
            accepting_orders: true,
            minimum_order_amount: Decimal::ZERO,
            pickup_enabled: true,
            delivery_enabled: true,
            opening_time: None,
            closing_time: None,
            currency: "NGN".to_string(),
            updated_at: Utc::now(),
        }
    }
}

impl RestaurantSettings {
    /// Reason new orders are refused, if any.
    pub fn order_block_reason(&self) -> Option<&'static str> {
        if !self.is_open {
            Some("The restaurant is currently closed")
        } else if !self.accepting_orders {
            Some("The restaurant is not accepting orders at the moment")
        } else {
            None
        }
    }
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub restaurant_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub address: Option<String>,
    pub is_open: Option<bool>,
    pub accepting_orders: Option<bool>,
    pub minimum_order_amount: Option<Decimal>,
    pub pickup_enabled: Option<bool>,
    pub delivery_enabled: Option<bool>,
    pub opening_time: Option<NaiveTime>,
    pub closing_time: Option<NaiveTime>,
    pub currency: Option<String>,
}

impl SettingsUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref name) = self.restaurant_name {
            if name.trim().is_empty() {
                return Err("Restaurant name cannot be empty".to_string());
            }
        }
        if let Some(amount) = self.minimum_order_amount {
            if amount.is_sign_negative() {
                return Err("Minimum order amount cannot be negative".to_string());
            }
        }
        if let Some(ref currency) = self.currency {
            if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err("Currency must be a 3-letter ISO code".to_string());
            }
        }
        if self.pickup_enabled == Some(false) && self.delivery_enabled == Some(false) {
            return Err("At least one of pickup or delivery must stay enabled".to_string());
        }
        Ok(())
    }

    pub fn apply(self, settings: &mut RestaurantSettings) {
        if let Some(v) = self.restaurant_name {
            settings.restaurant_name = v.trim().to_string();
        }
        if let Some(v) = self.contact_phone {
            settings.contact_phone = Some(v);
        }
        if let Some(v) = self.contact_email {
            settings.contact_email = Some(v);
        }
        if let Some(v) = self.address {
            settings.address = Some(v);
        }
        if let Some(v) = self.is_open {
            settings.is_open = v;
        }
        if let Some(v) = self.accepting_orders {
            settings.accepting_orders = v;
        }
        if let Some(v) = self.minimum_order_amount {
            settings.minimum_order_amount = v;
        }
        if let Some(v) = self.pickup_enabled {
            settings.pickup_enabled = v;
        }
        if let Some(v) = self.delivery_enabled {
            settings.delivery_enabled = v;
        }
        if let Some(v) = self.opening_time {
            settings.opening_time = Some(v);
        }
        if let Some(v) = self.closing_time {
            settings.closing_time = Some(v);
        }
        if let Some(v) = self.currency {
            settings.currency = v.to_ascii_uppercase();
        }
        settings.updated_at = Utc::now();
    }
}
