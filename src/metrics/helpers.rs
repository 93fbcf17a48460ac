//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    EVENTS_DELIVERED_TOTAL, EVENTS_DROPPED_TOTAL, EVENTS_EMITTED_TOTAL, ORDERS_CREATED_TOTAL,
    ORDERS_REJECTED_TOTAL, ORDER_STATUS_UPDATES_TOTAL, PAYMENTS_FAILED_TOTAL,
    PAYMENTS_INITIALIZED_TOTAL, PAYMENTS_VERIFIED_TOTAL, PAYMENT_GATEWAY_ERRORS_TOTAL,
    PAYMENT_GATEWAY_LATENCY, STALE_CONNECTIONS_REMOVED, WEBHOOKS_RECEIVED_TOTAL,
    WEBHOOKS_REJECTED_TOTAL, WS_MESSAGES_RECEIVED,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

pub struct OrderMetrics;

impl OrderMetrics {
    pub fn record_created(payment_method: &str) {
        ORDERS_CREATED_TOTAL.with_label_values(&[payment_method]).inc();
    }

    pub fn record_status_update(status: &str) {
        ORDER_STATUS_UPDATES_TOTAL.with_label_values(&[status]).inc();
    }

    pub fn record_rejected(reason: &str) {
        ORDERS_REJECTED_TOTAL.with_label_values(&[reason]).inc();
    }
}

/// Helper struct for recording payment metrics
pub struct PaymentMetrics;

impl PaymentMetrics {
    pub fn record_initialized() {
        PAYMENTS_INITIALIZED_TOTAL.inc();
    }

    pub fn record_verified() {
        PAYMENTS_VERIFIED_TOTAL.inc();
    }

    pub fn record_failed() {
        PAYMENTS_FAILED_TOTAL.inc();
    }

    /// Record a gateway call failure ("init" or "query")
    pub fn record_gateway_error(operation: &str) {
        PAYMENT_GATEWAY_ERRORS_TOTAL.with_label_values(&[operation]).inc();
    }

    pub fn observe_gateway_latency(seconds: f64) {
        PAYMENT_GATEWAY_LATENCY.observe(seconds);
    }

    pub fn record_webhook_received() {
        WEBHOOKS_RECEIVED_TOTAL.inc();
    }

    pub fn record_webhook_rejected() {
        WEBHOOKS_REJECTED_TOTAL.inc();
    }
}

pub struct RealtimeMetrics;

impl RealtimeMetrics {
    pub fn record_emitted(event: &str) {
        EVENTS_EMITTED_TOTAL.with_label_values(&[event]).inc();
    }

    pub fn record_delivered(count: u64) {
        EVENTS_DELIVERED_TOTAL.inc_by(count);
    }

    pub fn record_dropped(count: u64) {
        EVENTS_DROPPED_TOTAL.inc_by(count);
    }

    pub fn record_stale_removed(count: u64) {
        STALE_CONNECTIONS_REMOVED.inc_by(count);
    }
}

/// Helper struct for recording WebSocket message metrics
pub struct WsMessageMetrics;

impl WsMessageMetrics {
    pub fn record_subscribe() {
        WS_MESSAGES_RECEIVED.with_label_values(&["subscribe"]).inc();
    }

    pub fn record_unsubscribe() {
        WS_MESSAGES_RECEIVED.with_label_values(&["unsubscribe"]).inc();
    }

    pub fn record_ping() {
        WS_MESSAGES_RECEIVED.with_label_values(&["ping"]).inc();
    }

    pub fn record_invalid() {
        WS_MESSAGES_RECEIVED.with_label_values(&["invalid"]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_includes_recorded_metrics() {
        OrderMetrics::record_created("CASH");
        PaymentMetrics::record_webhook_received();
        RealtimeMetrics::record_emitted("order:new");

        let output = encode_metrics().unwrap();
        assert!(output.contains("food_order_orders_created_total"));
        assert!(output.contains("food_order_webhooks_received_total"));
        assert!(output.contains("food_order_events_emitted_total"));
    }
}
