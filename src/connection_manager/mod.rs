//! Registry of live WebSocket connections and their room memberships.

mod registry;
mod stats;
mod types;

pub use registry::ConnectionManager;
pub use stats::{ConnectionStats, RoomInfo};
pub use types::ConnectionHandle;
