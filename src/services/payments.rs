//! Online payment flow: opening a checkout with the gateway and reconciling
//! the gateway's verdict onto the order.

use std::time::Instant;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::domain::{Order, PaymentMethod, PaymentStatus};
use crate::error::AppError;
use crate::metrics::PaymentMetrics;
use crate::payment::{GatewayPaymentStatus, TransactionInit};
use crate::server::AppState;
use crate::store::PaymentUpdate;

use super::checkout::{place_order, CreateOrderRequest};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializedPayment {
    pub checkout_url: String,
    pub payment_reference: String,
    pub order_id: Uuid,
    pub order_number: String,
}

/// Persist an online order and open a gateway checkout for it.
///
/// When the gateway call fails the order stays on record with payment
/// status `FAILED`.
#[tracing::instrument(name = "payments.initialize", skip(state, request, user))]
pub async fn initialize_payment(
    state: &AppState,
    request: CreateOrderRequest,
    user: Option<&AuthUser>,
) -> Result<InitializedPayment, AppError> {
    let order = place_order(state.store.as_ref(), request, user, PaymentMethod::Online).await?;
    let payment_reference = order
        .payment_reference
        .clone()
        .ok_or_else(|| AppError::Internal("Online order without payment reference".to_string()))?;

    let init = TransactionInit {
        amount: order.total,
        customer_name: order.customer_name.clone(),
        customer_email: order.customer_email.clone().unwrap_or_default(),
        payment_reference: payment_reference.clone(),
        description: format!("Payment for order {}", order.order_number),
    };

    let started = Instant::now();
    let result = state.payment_gateway.init_transaction(&init).await;
    PaymentMetrics::observe_gateway_latency(started.elapsed().as_secs_f64());

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            PaymentMetrics::record_gateway_error("init");
            PaymentMetrics::record_failed();
            tracing::error!(order_id = %order.id, error = %e, "Payment initialization failed");
            let update = PaymentUpdate {
                payment_status: PaymentStatus::Failed,
                transaction_reference: None,
                paid_at: None,
            };
            if let Err(store_err) = state.store.update_payment(order.id, &update).await {
                tracing::error!(order_id = %order.id, error = %store_err, "Failed to mark payment as failed");
            }
            return Err(e.into());
        }
    };

    let update = PaymentUpdate {
        payment_status: PaymentStatus::Pending,
        transaction_reference: Some(response.transaction_reference),
        paid_at: None,
    };
    state.store.update_payment(order.id, &update).await?;
    PaymentMetrics::record_initialized();

    Ok(InitializedPayment {
        checkout_url: response.checkout_url,
        payment_reference,
        order_id: order.id,
        order_number: order.order_number,
    })
}

/// What reconciling a gateway report did to the order.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// Payment confirmed now; staff were notified
    Paid(Order),
    /// Order was already paid; nothing changed
    AlreadyPaid(Order),
    Failed(Order),
    /// Gateway has no final verdict yet (or the amount fell short)
    Pending(Order),
}

impl ReconcileOutcome {
    pub fn order(&self) -> &Order {
        match self {
            Self::Paid(o) | Self::AlreadyPaid(o) | Self::Failed(o) | Self::Pending(o) => o,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            Self::Paid(o) | Self::AlreadyPaid(o) | Self::Failed(o) | Self::Pending(o) => o,
        }
    }
}

/// Apply a gateway payment report to `order`. Safe to call repeatedly.
#[tracing::instrument(
    name = "payments.reconcile",
    skip(state, order, transaction_reference),
    fields(order_id = %order.id, status = ?status, amount_paid = %amount_paid)
)]
pub async fn reconcile_payment(
    state: &AppState,
    order: Order,
    status: &GatewayPaymentStatus,
    amount_paid: Decimal,
    transaction_reference: Option<String>,
) -> Result<ReconcileOutcome, AppError> {
    if order.payment_status == PaymentStatus::Paid {
        return Ok(ReconcileOutcome::AlreadyPaid(order));
    }

    if status.is_paid() {
        if amount_paid < order.total {
            tracing::warn!(
                order_id = %order.id,
                expected = %order.total,
                amount_paid = %amount_paid,
                "Paid amount below order total, leaving payment pending"
            );
            return Ok(ReconcileOutcome::Pending(order));
        }

        let update = PaymentUpdate {
            payment_status: PaymentStatus::Paid,
            transaction_reference,
            paid_at: Some(Utc::now()),
        };
        let paid = state.store.update_payment(order.id, &update).await?;
        PaymentMetrics::record_verified();
        tracing::info!(order_id = %paid.id, order_number = %paid.order_number, "Payment confirmed");

        state.dispatcher.order_created(&paid);
        return Ok(ReconcileOutcome::Paid(paid));
    }

    if status.is_failed() {
        if order.payment_status == PaymentStatus::Failed {
            return Ok(ReconcileOutcome::Failed(order));
        }
        let update = PaymentUpdate {
            payment_status: PaymentStatus::Failed,
            transaction_reference,
            paid_at: None,
        };
        let failed = state.store.update_payment(order.id, &update).await?;
        PaymentMetrics::record_failed();
        tracing::info!(order_id = %failed.id, status = ?status, "Payment failed");
        return Ok(ReconcileOutcome::Failed(failed));
    }

    Ok(ReconcileOutcome::Pending(order))
}
