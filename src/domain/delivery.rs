use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryLocation {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub delivery_fee: Decimal,
    pub estimated_minutes: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryLocation {
    pub fn new(name: impl Into<String>, delivery_fee: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            delivery_fee,
            estimated_minutes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Sub-zone of a location, optionally costing extra on top of the location fee
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryArea {
    pub id: Uuid,
    pub location_id: Uuid,
    pub name: String,
    pub additional_fee: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryArea {
    pub fn new(location_id: Uuid, name: impl Into<String>, additional_fee: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            location_id,
            name: name.into(),
            additional_fee,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fee charged for delivering to `location`, plus the area surcharge if any.
pub fn delivery_fee(location: &DeliveryLocation, area: Option<&DeliveryArea>) -> Decimal {
    location.delivery_fee + area.map(|a| a.additional_fee).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_fee_with_and_without_area() {
        let location = DeliveryLocation::new("Lekki Phase 1", Decimal::new(1500, 0));
        let area = DeliveryArea::new(location.id, "Admiralty Way", Decimal::new(250, 0));

        assert_eq!(delivery_fee(&location, None), Decimal::new(1500, 0));
        assert_eq!(delivery_fee(&location, Some(&area)), Decimal::new(1750, 0));
    }
}
