use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::connection_manager::{ConnectionHandle, ConnectionManager};
use crate::domain::{DeliveryLocation, MenuItem, Order, RestaurantSettings};
use crate::metrics::RealtimeMetrics;
use crate::websocket::ServerMessage;

use super::{events, rooms};

/// Result of one emit
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    pub event: String,
    /// Connections the event was queued for
    pub delivered_to: usize,
    /// Connections whose buffer was full or closed
    pub dropped: usize,
}

#[derive(Debug, Default)]
struct DispatcherStats {
    total_emitted: AtomicU64,
    total_delivered: AtomicU64,
    total_dropped: AtomicU64,
    room_events: AtomicU64,
    broadcast_events: AtomicU64,
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatcherStatsSnapshot {
    pub total_emitted: u64,
    pub total_delivered: u64,
    pub total_dropped: u64,
    pub room_events: u64,
    pub broadcast_events: u64,
}

/// Fans realtime events out to connected clients.
///
/// Delivery is at-most-once: a connection whose outbound buffer is full
/// misses the event.
pub struct EventDispatcher {
    connection_manager: Arc<ConnectionManager>,
    stats: DispatcherStats,
}

impl EventDispatcher {
    pub fn new(connection_manager: Arc<ConnectionManager>) -> Self {
        Self {
            connection_manager,
            stats: DispatcherStats::default(),
        }
    }

    pub fn stats(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            total_emitted: self.stats.total_emitted.load(Ordering::Relaxed),
            total_delivered: self.stats.total_delivered.load(Ordering::Relaxed),
            total_dropped: self.stats.total_dropped.load(Ordering::Relaxed),
            room_events: self.stats.room_events.load(Ordering::Relaxed),
            broadcast_events: self.stats.broadcast_events.load(Ordering::Relaxed),
        }
    }

    #[tracing::instrument(name = "dispatcher.emit_to_room", skip(self, data))]
    pub fn emit_to_room(&self, room: &str, event: &str, data: Value) -> DeliveryResult {
        let connections = self.connection_manager.get_room_connections(room);
        self.stats.room_events.fetch_add(1, Ordering::Relaxed);
        self.deliver(&connections, event, data)
    }

    /// Emit once per connection even when it sits in several of `rooms`.
    #[tracing::instrument(name = "dispatcher.emit_to_rooms", skip(self, data))]
    pub fn emit_to_rooms(&self, rooms: &[String], event: &str, data: Value) -> DeliveryResult {
        let mut seen = HashSet::new();
        let mut connections = Vec::new();
        for room in rooms {
            for conn in self.connection_manager.get_room_connections(room) {
                if seen.insert(conn.id) {
                    connections.push(conn);
                }
            }
        }
        self.stats.room_events.fetch_add(1, Ordering::Relaxed);
        self.deliver(&connections, event, data)
    }

    #[tracing::instrument(name = "dispatcher.broadcast", skip(self, data))]
    pub fn broadcast(&self, event: &str, data: Value) -> DeliveryResult {
        let connections = self.connection_manager.get_all_connections();
        self.stats.broadcast_events.fetch_add(1, Ordering::Relaxed);
        self.deliver(&connections, event, data)
    }

    fn deliver(&self, connections: &[Arc<ConnectionHandle>], event: &str, data: Value) -> DeliveryResult {
        let message = ServerMessage::event(event, data);
        let mut delivered = 0;
        let mut dropped = 0;

        for conn in connections {
            match conn.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    dropped += 1;
                    tracing::debug!(connection_id = %conn.id, event = %event, error = %e, "Event dropped");
                }
            }
        }

        self.stats.total_emitted.fetch_add(1, Ordering::Relaxed);
        self.stats.total_delivered.fetch_add(delivered as u64, Ordering::Relaxed);
        self.stats.total_dropped.fetch_add(dropped as u64, Ordering::Relaxed);

        RealtimeMetrics::record_emitted(event);
        RealtimeMetrics::record_delivered(delivered as u64);
        RealtimeMetrics::record_dropped(dropped as u64);

        tracing::debug!(event = %event, delivered = delivered, dropped = dropped, "Event emitted");

        DeliveryResult {
            event: event.to_string(),
            delivered_to: delivered,
            dropped,
        }
    }

    // ------------------------------------------------------------------------
    // Domain events
    // ------------------------------------------------------------------------

    /// New order visible to the kitchen: `order:new` to staff.
    pub fn order_created(&self, order: &Order) -> DeliveryResult {
        self.emit_to_room(rooms::STAFF, events::ORDER_NEW, events::order_new(order))
    }

    /// `order:statusUpdate` to staff, the owner and anyone tracking the order.
    pub fn order_status_changed(&self, order: &Order) -> DeliveryResult {
        let mut targets = vec![rooms::STAFF.to_string(), rooms::order(order.id)];
        if let Some(user_id) = order.user_id {
            targets.push(rooms::user(user_id));
        }
        self.emit_to_rooms(&targets, events::ORDER_STATUS_UPDATE, events::order_status_update(order))
    }

    pub fn menu_availability_changed(&self, item: &MenuItem) -> DeliveryResult {
        self.broadcast(
            events::MENU_AVAILABILITY_CHANGED,
            events::menu_availability_changed(item),
        )
    }

    pub fn delivery_status_changed(&self, location: &DeliveryLocation) -> DeliveryResult {
        self.broadcast(
            events::DELIVERY_STATUS_CHANGED,
            events::delivery_status_changed(location),
        )
    }

    pub fn settings_updated(&self, settings: &RestaurantSettings) -> DeliveryResult {
        self.broadcast(events::SETTINGS_UPDATED, events::settings_updated(settings))
    }
}
