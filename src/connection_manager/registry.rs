use chrono::Utc;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::Role;
use crate::websocket::ServerMessage;

use super::stats::{ConnectionStats, RoomInfo};
use super::types::ConnectionHandle;

/// Manages all active WebSocket connections
pub struct ConnectionManager {
    /// connection_id -> ConnectionHandle
    connections: DashMap<Uuid, Arc<ConnectionHandle>>,
    /// user_id -> Set<connection_id> (supports multiple devices)
    user_index: DashMap<Uuid, HashSet<Uuid>>,
    /// room -> Set<connection_id>
    room_index: DashMap<String, HashSet<Uuid>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            user_index: DashMap::new(),
            room_index: DashMap::new(),
        }
    }

    /// Register a new connection. Guests pass `None` for both user and role.
    pub fn register(
        &self,
        user_id: Option<Uuid>,
        role: Option<Role>,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Arc<ConnectionHandle> {
        let handle = Arc::new(ConnectionHandle::new(user_id, role, sender));
        let conn_id = handle.id;

        self.connections.insert(conn_id, handle.clone());

        if let Some(user_id) = user_id {
            self.user_index.entry(user_id).or_default().insert(conn_id);
        }

        tracing::info!(
            connection_id = %conn_id,
            user_id = ?user_id,
            role = ?role,
            "Connection registered"
        );

        handle
    }

    /// Unregister a connection and drop it from every room
    pub async fn unregister(&self, connection_id: Uuid) {
        let Some((_, handle)) = self.connections.remove(&connection_id) else {
            return;
        };

        if let Some(user_id) = handle.user_id {
            if let Some(mut user_conns) = self.user_index.get_mut(&user_id) {
                user_conns.remove(&connection_id);
                if user_conns.is_empty() {
                    drop(user_conns);
                    self.user_index.remove_if(&user_id, |_, conns| conns.is_empty());
                }
            }
        }

        let rooms: Vec<String> = handle.rooms.read().await.iter().cloned().collect();
        for room in rooms {
            self.remove_from_room_index(&room, connection_id);
        }

        tracing::info!(connection_id = %connection_id, user_id = ?handle.user_id, "Connection unregistered");
    }

    fn remove_from_room_index(&self, room: &str, connection_id: Uuid) {
        if let Some(mut members) = self.room_index.get_mut(room) {
            members.remove(&connection_id);
            if members.is_empty() {
                drop(members);
                self.room_index.remove_if(room, |_, members| members.is_empty());
            }
        }
    }

    /// Add a connection to a room. Returns false for unknown connections.
    pub async fn join_room(&self, connection_id: Uuid, room: &str) -> bool {
        let Some(handle) = self.get_connection(connection_id) else {
            return false;
        };

        handle.rooms.write().await.insert(room.to_string());
        self.room_index
            .entry(room.to_string())
            .or_default()
            .insert(connection_id);

        tracing::debug!(connection_id = %connection_id, room = %room, "Joined room");
        true
    }

    pub async fn leave_room(&self, connection_id: Uuid, room: &str) {
        if let Some(handle) = self.get_connection(connection_id) {
            handle.rooms.write().await.remove(room);
            self.remove_from_room_index(room, connection_id);
            tracing::debug!(connection_id = %connection_id, room = %room, "Left room");
        }
    }

    /// Get all connections for a user
    pub fn get_user_connections(&self, user_id: Uuid) -> Vec<Arc<ConnectionHandle>> {
        self.user_index
            .get(&user_id)
            .map(|conn_ids| {
                conn_ids
                    .iter()
                    .filter_map(|id| self.connections.get(id).map(|h| h.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get all connections in a room
    pub fn get_room_connections(&self, room: &str) -> Vec<Arc<ConnectionHandle>> {
        self.room_index
            .get(room)
            .map(|conn_ids| {
                conn_ids
                    .iter()
                    .filter_map(|id| self.connections.get(id).map(|h| h.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.connections.iter().map(|r| r.value().clone()).collect()
    }

    pub fn get_connection(&self, connection_id: Uuid) -> Option<Arc<ConnectionHandle>> {
        self.connections.get(&connection_id).map(|h| h.clone())
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn stats(&self) -> ConnectionStats {
        let rooms: HashMap<String, usize> = self
            .room_index
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().len()))
            .collect();
        let authenticated: usize = self.user_index.iter().map(|e| e.value().len()).sum();

        ConnectionStats {
            total_connections: self.connections.len(),
            unique_users: self.user_index.len(),
            guest_connections: self.connections.len().saturating_sub(authenticated),
            rooms,
        }
    }

    /// Rooms sorted by member count, largest first
    pub fn list_rooms(&self) -> Vec<RoomInfo> {
        let mut rooms: Vec<RoomInfo> = self
            .room_index
            .iter()
            .map(|entry| RoomInfo {
                name: entry.key().clone(),
                member_count: entry.value().len(),
            })
            .collect();
        rooms.sort_by(|a, b| b.member_count.cmp(&a.member_count).then(a.name.cmp(&b.name)));
        rooms
    }

    /// Find connections that have been inactive for longer than the timeout
    pub fn find_stale_connections(&self, timeout_secs: u64) -> Vec<Uuid> {
        let now = Utc::now();
        let timeout = chrono::Duration::seconds(timeout_secs as i64);

        self.connections
            .iter()
            .filter(|entry| now.signed_duration_since(entry.value().last_activity()) > timeout)
            .map(|entry| *entry.key())
            .collect()
    }

    /// Remove stale connections and return how many were removed
    pub async fn cleanup_stale_connections(&self, timeout_secs: u64) -> usize {
        let stale = self.find_stale_connections(timeout_secs);
        let count = stale.len();

        for conn_id in stale {
            tracing::info!(connection_id = %conn_id, "Removing stale connection due to timeout");
            self.unregister(conn_id).await;
        }

        count
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
