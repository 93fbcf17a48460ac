//! Realtime events: room naming, event names and the dispatcher that fans
//! events out to WebSocket connections.

mod dispatcher;
pub mod events;
pub mod rooms;

pub use dispatcher::{DeliveryResult, DispatcherStatsSnapshot, EventDispatcher};
