use rust_decimal::Decimal;
use serde::Deserialize;

use super::{decimal_from_any, GatewayPaymentStatus};

/// Event type that carries a completed payment.
pub const SUCCESSFUL_TRANSACTION: &str = "SUCCESSFUL_TRANSACTION";

/// Webhook delivery envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    pub event_type: String,
    pub event_data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEventData {
    pub payment_reference: String,
    #[serde(default)]
    pub transaction_reference: Option<String>,
    #[serde(default, deserialize_with = "decimal_from_any")]
    pub amount_paid: Decimal,
    #[serde(default = "default_status")]
    pub payment_status: GatewayPaymentStatus,
}

fn default_status() -> GatewayPaymentStatus {
    GatewayPaymentStatus::Paid
}

impl WebhookEvent {
    pub fn is_successful_transaction(&self) -> bool {
        self.event_type == SUCCESSFUL_TRANSACTION
    }
}
