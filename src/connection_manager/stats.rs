//! Connection statistics and info structures

use serde::Serialize;
use std::collections::HashMap;

/// Connection statistics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStats {
    pub total_connections: usize,
    pub unique_users: usize,
    pub guest_connections: usize,
    pub rooms: HashMap<String, usize>,
}

/// Room membership summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub name: String,
    pub member_count: usize,
}
