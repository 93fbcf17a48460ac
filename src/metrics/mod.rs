//! Prometheus metrics for the ordering service.
//!
//! - HTTP-level business counters (orders, status changes, payments, webhooks)
//! - Realtime metrics (connections, rooms, events emitted)

mod helpers;

pub use helpers::{encode_metrics, OrderMetrics, PaymentMetrics, RealtimeMetrics, WsMessageMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "food_order";

lazy_static! {
    // ============================================================================
    // Order Metrics
    // ============================================================================

    /// Orders created, by payment method
    pub static ref ORDERS_CREATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_orders_created_total", METRIC_PREFIX),
        "Total orders created",
        &["payment_method"]
    ).unwrap();

    /// Order status transitions, by new status
    pub static ref ORDER_STATUS_UPDATES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_order_status_updates_total", METRIC_PREFIX),
        "Total order status transitions",
        &["status"]
    ).unwrap();

    /// Orders refused at checkout, by reason
    pub static ref ORDERS_REJECTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_orders_rejected_total", METRIC_PREFIX),
        "Total order submissions rejected during validation",
        &["reason"]
    ).unwrap();

    // ============================================================================
    // Payment Metrics
    // ============================================================================

    /// Payments initialized with the gateway
    pub static ref PAYMENTS_INITIALIZED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_payments_initialized_total", METRIC_PREFIX),
        "Total payment transactions initialized"
    ).unwrap();

    /// Payments confirmed as paid
    pub static ref PAYMENTS_VERIFIED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_payments_verified_total", METRIC_PREFIX),
        "Total payments confirmed as paid"
    ).unwrap();

    /// Payments marked failed
    pub static ref PAYMENTS_FAILED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_payments_failed_total", METRIC_PREFIX),
        "Total payments marked failed"
    ).unwrap();

    /// Gateway call failures, by operation
    pub static ref PAYMENT_GATEWAY_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_payment_gateway_errors_total", METRIC_PREFIX),
        "Total payment gateway call failures",
        &["operation"]
    ).unwrap();

    /// Gateway call latency
    pub static ref PAYMENT_GATEWAY_LATENCY: Histogram = register_histogram!(
        format!("{}_payment_gateway_latency_seconds", METRIC_PREFIX),
        "Payment gateway call latency in seconds",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();

    /// Webhook deliveries received
    pub static ref WEBHOOKS_RECEIVED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_webhooks_received_total", METRIC_PREFIX),
        "Total payment webhooks received"
    ).unwrap();

    /// Webhook deliveries rejected for a bad signature
    pub static ref WEBHOOKS_REJECTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_webhooks_rejected_total", METRIC_PREFIX),
        "Total payment webhooks rejected due to invalid signature"
    ).unwrap();

    // ============================================================================
    // Realtime Metrics
    // ============================================================================

    /// Total number of active WebSocket connections
    pub static ref CONNECTIONS_TOTAL: IntGauge = register_int_gauge!(
        format!("{}_ws_connections_total", METRIC_PREFIX),
        "Total number of active WebSocket connections"
    ).unwrap();

    /// Number of unique signed-in users connected
    pub static ref USERS_CONNECTED: IntGauge = register_int_gauge!(
        format!("{}_ws_users_connected", METRIC_PREFIX),
        "Number of unique authenticated users connected"
    ).unwrap();

    /// Rooms with at least one member
    pub static ref ROOMS_ACTIVE: IntGauge = register_int_gauge!(
        format!("{}_ws_rooms_active", METRIC_PREFIX),
        "Total number of rooms with at least one member"
    ).unwrap();

    /// Connections opened since start
    pub static ref WS_CONNECTIONS_OPENED: IntCounter = register_int_counter!(
        format!("{}_ws_connections_opened_total", METRIC_PREFIX),
        "Total WebSocket connections opened"
    ).unwrap();

    /// Connections closed since start
    pub static ref WS_CONNECTIONS_CLOSED: IntCounter = register_int_counter!(
        format!("{}_ws_connections_closed_total", METRIC_PREFIX),
        "Total WebSocket connections closed"
    ).unwrap();

    /// Connection duration
    pub static ref WS_CONNECTION_DURATION: Histogram = register_histogram!(
        format!("{}_ws_connection_duration_seconds", METRIC_PREFIX),
        "WebSocket connection duration in seconds",
        vec![1.0, 10.0, 60.0, 300.0, 900.0, 3600.0, 14400.0]
    ).unwrap();

    /// Client messages received, by type
    pub static ref WS_MESSAGES_RECEIVED: IntCounterVec = register_int_counter_vec!(
        format!("{}_ws_messages_received_total", METRIC_PREFIX),
        "Total WebSocket messages received from clients",
        &["type"]
    ).unwrap();

    /// Realtime events emitted, by event name
    pub static ref EVENTS_EMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_events_emitted_total", METRIC_PREFIX),
        "Total realtime events emitted",
        &["event"]
    ).unwrap();

    /// Event deliveries (connection count)
    pub static ref EVENTS_DELIVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_events_delivered_total", METRIC_PREFIX),
        "Total realtime events delivered to connections"
    ).unwrap();

    /// Event deliveries dropped (closed or full connection buffer)
    pub static ref EVENTS_DROPPED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_events_dropped_total", METRIC_PREFIX),
        "Total realtime events dropped"
    ).unwrap();

    /// Stale connections removed by the heartbeat task
    pub static ref STALE_CONNECTIONS_REMOVED: IntCounter = register_int_counter!(
        format!("{}_ws_stale_connections_removed_total", METRIC_PREFIX),
        "Total connections removed for inactivity"
    ).unwrap();
}
