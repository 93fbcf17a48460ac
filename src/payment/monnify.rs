//! Monnify REST client.
//!
//! Calls are authenticated with a bearer token obtained through Basic-auth
//! login; the token is cached until shortly before it expires.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::MonnifyConfig;

use super::{
    decimal_from_any, GatewayPaymentStatus, InitResponse, PaymentError, PaymentGateway,
    TransactionInit, TransactionStatus,
};

/// Refresh the cached token this long before Monnify says it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

pub struct MonnifyClient {
    http: reqwest::Client,
    config: MonnifyConfig,
    token: RwLock<Option<CachedToken>>,
}

/// Every Monnify response is wrapped in this envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    request_successful: bool,
    #[serde(default)]
    response_message: Option<String>,
    response_body: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitTransactionRequest<'a> {
    amount: Decimal,
    customer_name: &'a str,
    customer_email: &'a str,
    payment_reference: &'a str,
    payment_description: &'a str,
    currency_code: &'a str,
    contract_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_url: Option<&'a str>,
    payment_methods: [&'a str; 2],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitTransactionBody {
    transaction_reference: String,
    checkout_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryTransactionBody {
    payment_reference: String,
    #[serde(default)]
    transaction_reference: Option<String>,
    payment_status: GatewayPaymentStatus,
    #[serde(default, deserialize_with = "decimal_from_any")]
    amount_paid: Decimal,
}

impl MonnifyClient {
    pub fn new(config: &MonnifyConfig) -> Result<Self, PaymentError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            config: config.clone(),
            token: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
            && !self.config.secret_key.is_empty()
            && !self.config.contract_code.is_empty()
    }

    /// Return a valid access token, logging in again when the cache is stale.
    async fn access_token(&self) -> Result<String, PaymentError> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if Instant::now() < token.expires_at {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let mut cached = self.token.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.access_token.clone());
            }
        }

        let response = self
            .http
            .post(self.url("/api/v1/auth/login"))
            .basic_auth(&self.config.api_key, Some(&self.config.secret_key))
            .send()
            .await?;
        let login: LoginBody = Self::unwrap_envelope(response).await?;

        let lifetime = Duration::from_secs(login.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        tracing::debug!(expires_in = login.expires_in, "Monnify access token refreshed");

        *cached = Some(CachedToken {
            access_token: login.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(login.access_token)
    }

    async fn unwrap_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PaymentError> {
        let status = response.status();
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| PaymentError::Decode(format!("HTTP {}: {}", status, e)))?;

        if !envelope.request_successful {
            return Err(PaymentError::Rejected(
                envelope
                    .response_message
                    .unwrap_or_else(|| format!("HTTP {}", status)),
            ));
        }

        envelope
            .response_body
            .ok_or_else(|| PaymentError::Decode("missing responseBody".to_string()))
    }
}

#[async_trait]
impl PaymentGateway for MonnifyClient {
    #[tracing::instrument(skip(self, request), fields(reference = %request.payment_reference))]
    async fn init_transaction(&self, request: &TransactionInit) -> Result<InitResponse, PaymentError> {
        if !self.is_configured() {
            return Err(PaymentError::NotConfigured);
        }
        let token = self.access_token().await?;

        let body = InitTransactionRequest {
            amount: request.amount,
            customer_name: &request.customer_name,
            customer_email: &request.customer_email,
            payment_reference: &request.payment_reference,
            payment_description: &request.description,
            currency_code: &self.config.currency,
            contract_code: &self.config.contract_code,
            redirect_url: self.config.redirect_url.as_deref(),
            payment_methods: ["CARD", "ACCOUNT_TRANSFER"],
        };

        let response = self
            .http
            .post(self.url("/api/v1/merchant/transactions/init-transaction"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let init: InitTransactionBody = Self::unwrap_envelope(response).await?;

        tracing::info!(
            transaction_reference = %init.transaction_reference,
            "Monnify transaction initialized"
        );

        Ok(InitResponse {
            checkout_url: init.checkout_url,
            transaction_reference: init.transaction_reference,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn query_transaction(&self, payment_reference: &str) -> Result<TransactionStatus, PaymentError> {
        if !self.is_configured() {
            return Err(PaymentError::NotConfigured);
        }
        let token = self.access_token().await?;

        let response = self
            .http
            .get(self.url("/api/v2/merchant/transactions/query"))
            .query(&[("paymentReference", payment_reference)])
            .bearer_auth(token)
            .send()
            .await?;
        let body: QueryTransactionBody = Self::unwrap_envelope(response).await?;

        Ok(TransactionStatus {
            payment_reference: body.payment_reference,
            transaction_reference: body.transaction_reference,
            payment_status: body.payment_status,
            amount_paid: body.amount_paid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let config = MonnifyConfig {
            base_url: "https://sandbox.monnify.com/".to_string(),
            ..MonnifyConfig::default()
        };
        let client = MonnifyClient::new(&config).unwrap();
        assert_eq!(
            client.url("/api/v1/auth/login"),
            "https://sandbox.monnify.com/api/v1/auth/login"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_client_refuses() {
        let client = MonnifyClient::new(&MonnifyConfig::default()).unwrap();
        let err = client.query_transaction("FOOD-1-ABC").await.unwrap_err();
        assert!(matches!(err, PaymentError::NotConfigured));
    }

    #[test]
    fn test_envelope_parsing() {
        let json = r#"{
            "requestSuccessful": true,
            "responseMessage": "success",
            "responseCode": "0",
            "responseBody": {
                "paymentReference": "FOOD-1-ABC",
                "transactionReference": "MNFY|1",
                "paymentStatus": "PAID",
                "amountPaid": "1500.00",
                "totalPayable": "1500.00"
            }
        }"#;
        let envelope: Envelope<QueryTransactionBody> = serde_json::from_str(json).unwrap();
        assert!(envelope.request_successful);
        let body = envelope.response_body.unwrap();
        assert!(body.payment_status.is_paid());
        assert_eq!(body.amount_paid, Decimal::new(1500, 0));
    }

    #[test]
    fn test_init_request_shape() {
        let body = InitTransactionRequest {
            amount: Decimal::new(2500, 0),
            customer_name: "Ada",
            customer_email: "ada@example.com",
            payment_reference: "FOOD-1-ABC",
            payment_description: "Order ORD-20260101-ABC123",
            currency_code: "NGN",
            contract_code: "1234567890",
            redirect_url: None,
            payment_methods: ["CARD", "ACCOUNT_TRANSFER"],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["paymentReference"], "FOOD-1-ABC");
        assert_eq!(value["currencyCode"], "NGN");
        assert!(value.get("redirectUrl").is_none());
    }
}
