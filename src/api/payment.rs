//! Online payment endpoints: checkout initialization, verification and the
//! gateway webhook.

use std::time::Instant;

use axum::{body::Bytes, extract::State, http::HeaderMap};
use serde::Serialize;

use crate::auth::MaybeAuthUser;
use crate::domain::{Order, PaymentStatus};
use crate::error::{AppError, Result};
use crate::metrics::PaymentMetrics;
use crate::payment::{verify_webhook_signature, WebhookEvent, SIGNATURE_HEADER};
use crate::server::AppState;
use crate::services::{initialize_payment, reconcile_payment, CreateOrderRequest, InitializedPayment, ReconcileOutcome};

use super::extract::{ApiJson, ApiPath};
use super::response::ApiResponse;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub payment_status: PaymentStatus,
    pub order: Order,
}

/// POST /api/payment/initialize
#[tracing::instrument(name = "http.payment.initialize", skip(state, auth, request))]
pub async fn initialize(
    State(state): State<AppState>,
    MaybeAuthUser(auth): MaybeAuthUser,
    ApiJson(request): ApiJson<CreateOrderRequest>,
) -> Result<ApiResponse<InitializedPayment>> {
    let payment = initialize_payment(&state, request, auth.as_ref()).await?;
    tracing::info!(
        order_id = %payment.order_id,
        payment_reference = %payment.payment_reference,
        "Payment initialized"
    );
    Ok(ApiResponse::created(payment).with_message("Payment initialized"))
}

/// GET /api/payment/verify/{reference}
#[tracing::instrument(name = "http.payment.verify", skip(state))]
pub async fn verify(
    State(state): State<AppState>,
    ApiPath(reference): ApiPath<String>,
) -> Result<ApiResponse<VerificationResult>> {
    let order = state
        .store
        .find_order_by_payment_reference(&reference)
        .await?
        .ok_or_else(|| AppError::not_found("Payment"))?;

    if order.payment_status == PaymentStatus::Paid {
        return Ok(ApiResponse::ok(VerificationResult {
            payment_status: order.payment_status,
            order,
        })
        .with_message("Payment already confirmed"));
    }

    let started = Instant::now();
    let result = state.payment_gateway.query_transaction(&reference).await;
    PaymentMetrics::observe_gateway_latency(started.elapsed().as_secs_f64());
    let transaction = result.inspect_err(|e| {
        PaymentMetrics::record_gateway_error("query");
        tracing::error!(payment_reference = %reference, error = %e, "Payment query failed");
    })?;

    let outcome = reconcile_payment(
        &state,
        order,
        &transaction.payment_status,
        transaction.amount_paid,
        transaction.transaction_reference,
    )
    .await?;

    let message = match outcome {
        ReconcileOutcome::Paid(_) => "Payment confirmed",
        ReconcileOutcome::AlreadyPaid(_) => "Payment already confirmed",
        ReconcileOutcome::Failed(_) => "Payment failed",
        ReconcileOutcome::Pending(_) => "Payment is still pending",
    };
    let order = outcome.into_order();
    Ok(ApiResponse::ok(VerificationResult {
        payment_status: order.payment_status,
        order,
    })
    .with_message(message))
}

/// POST /api/payment/webhook
///
/// The signature covers the raw body, so the body is taken as bytes and only
/// parsed after it has been authenticated.
#[tracing::instrument(name = "http.payment.webhook", skip(state, headers, body), fields(len = body.len()))]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ApiResponse<serde_json::Value>> {
    PaymentMetrics::record_webhook_received();

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !verify_webhook_signature(&body, signature, &state.settings.monnify.secret_key) {
        PaymentMetrics::record_webhook_rejected();
        tracing::warn!("Webhook signature verification failed");
        return Err(AppError::Unauthorized("Invalid webhook signature".to_string()));
    }

    let event: WebhookEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "Malformed webhook payload");
        AppError::Validation(format!("Malformed webhook payload: {}", e))
    })?;

    let acknowledged = |message: &str| Ok(ApiResponse::ok(serde_json::Value::Null).with_message(message));

    if !event.is_successful_transaction() {
        tracing::info!(event_type = %event.event_type, "Ignoring webhook event");
        return acknowledged("Event ignored");
    }

    let data = event.event_data;
    let Some(order) = state
        .store
        .find_order_by_payment_reference(&data.payment_reference)
        .await?
    else {
        tracing::warn!(payment_reference = %data.payment_reference, "Webhook for unknown payment reference");
        return acknowledged("Unknown payment reference");
    };

    let outcome = reconcile_payment(
        &state,
        order,
        &data.payment_status,
        data.amount_paid,
        data.transaction_reference,
    )
    .await?;
    tracing::info!(order_id = %outcome.order().id, outcome = outcome_label(&outcome), "Webhook processed");

    acknowledged("Webhook processed")
}

fn outcome_label(outcome: &ReconcileOutcome) -> &'static str {
    match outcome {
        ReconcileOutcome::Paid(_) => "paid",
        ReconcileOutcome::AlreadyPaid(_) => "already_paid",
        ReconcileOutcome::Failed(_) => "failed",
        ReconcileOutcome::Pending(_) => "pending",
    }
}
