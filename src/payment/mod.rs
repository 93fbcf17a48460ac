//! Payment gateway integration.
//!
//! Handlers talk to [`PaymentGateway`]; production wires in [`MonnifyClient`],
//! tests substitute a stub.

pub mod monnify;
pub mod signature;
pub mod webhook;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub use monnify::MonnifyClient;
pub use signature::{sign_webhook_body, verify_webhook_signature, SIGNATURE_HEADER};
pub use webhook::{WebhookEvent, WebhookEventData, SUCCESSFUL_TRANSACTION};

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway answered but refused the request
    #[error("Gateway rejected request: {0}")]
    Rejected(String),

    #[error("Unexpected gateway response: {0}")]
    Decode(String),

    #[error("Payment gateway is not configured")]
    NotConfigured,
}

/// Data needed to open a checkout session for an order.
#[derive(Debug, Clone)]
pub struct TransactionInit {
    pub amount: Decimal,
    pub customer_name: String,
    pub customer_email: String,
    pub payment_reference: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct InitResponse {
    pub checkout_url: String,
    pub transaction_reference: String,
}

/// Payment status as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayPaymentStatus {
    Paid,
    Overpaid,
    PartiallyPaid,
    Pending,
    Failed,
    Expired,
    Cancelled,
    Other(String),
}

impl GatewayPaymentStatus {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "PAID" => Self::Paid,
            "OVERPAID" => Self::Overpaid,
            "PARTIALLY_PAID" => Self::PartiallyPaid,
            "PENDING" => Self::Pending,
            "FAILED" => Self::Failed,
            "EXPIRED" => Self::Expired,
            "CANCELLED" => Self::Cancelled,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Paid | Self::Overpaid)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed | Self::Expired | Self::Cancelled)
    }
}

impl<'de> Deserialize<'de> for GatewayPaymentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

/// Result of querying a transaction by payment reference.
#[derive(Debug, Clone)]
pub struct TransactionStatus {
    pub payment_reference: String,
    pub transaction_reference: Option<String>,
    pub payment_status: GatewayPaymentStatus,
    pub amount_paid: Decimal,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn init_transaction(&self, request: &TransactionInit) -> Result<InitResponse, PaymentError>;

    async fn query_transaction(&self, payment_reference: &str) -> Result<TransactionStatus, PaymentError>;
}

/// Monnify sends amounts as JSON numbers in some payloads and strings in others.
pub(crate) fn decimal_from_any<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    let text = match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Null => return Ok(Decimal::ZERO),
        other => return Err(D::Error::custom(format!("invalid amount: {}", other))),
    };
    text.trim()
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(text.trim()))
        .map_err(D::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Amount {
        #[serde(deserialize_with = "decimal_from_any")]
        value: Decimal,
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(GatewayPaymentStatus::parse("paid"), GatewayPaymentStatus::Paid);
        assert!(GatewayPaymentStatus::parse("OVERPAID").is_paid());
        assert!(GatewayPaymentStatus::parse("EXPIRED").is_failed());
        assert!(!GatewayPaymentStatus::parse("PARTIALLY_PAID").is_paid());
        assert_eq!(
            GatewayPaymentStatus::parse("REVERSED"),
            GatewayPaymentStatus::Other("REVERSED".to_string())
        );
    }

    #[test]
    fn test_amount_from_string_or_number() {
        let a: Amount = serde_json::from_str(r#"{"value":"2500.50"}"#).unwrap();
        assert_eq!(a.value, Decimal::new(250050, 2));

        let b: Amount = serde_json::from_str(r#"{"value":1200}"#).unwrap();
        assert_eq!(b.value, Decimal::new(1200, 0));

        assert!(serde_json::from_str::<Amount>(r#"{"value":true}"#).is_err());
    }
}
