//! Connection handle

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::domain::Role;
use crate::websocket::ServerMessage;

/// Handle for a single WebSocket connection
pub struct ConnectionHandle {
    pub id: Uuid,
    /// `None` for guests
    pub user_id: Option<Uuid>,
    pub role: Option<Role>,
    pub sender: mpsc::Sender<ServerMessage>,
    pub connected_at: DateTime<Utc>,
    /// Last activity timestamp (Unix seconds)
    last_activity: AtomicI64,
    pub rooms: RwLock<HashSet<String>>,
}

impl ConnectionHandle {
    pub fn new(user_id: Option<Uuid>, role: Option<Role>, sender: mpsc::Sender<ServerMessage>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            role,
            sender,
            connected_at: now,
            last_activity: AtomicI64::new(now.timestamp()),
            rooms: RwLock::new(HashSet::new()),
        }
    }

    pub fn update_activity(&self) {
        self.last_activity
            .store(Utc::now().timestamp(), Ordering::Relaxed);
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.last_activity.load(Ordering::Relaxed), 0)
            .unwrap_or_else(Utc::now)
    }

    /// Queue a message, waiting for buffer space.
    pub async fn send(&self, message: ServerMessage) -> Result<(), mpsc::error::SendError<ServerMessage>> {
        self.sender.send(message).await
    }

    /// Queue a message without waiting; fails when the buffer is full or closed.
    pub fn try_send(&self, message: ServerMessage) -> Result<(), mpsc::error::TrySendError<ServerMessage>> {
        self.sender.try_send(message)
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_some_and(|r| r.is_staff())
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guest_handle() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(None, None, tx);
        assert!(!handle.is_authenticated());
        assert!(!handle.is_staff());
        assert_eq!(handle.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_try_send_full_buffer() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(Some(Uuid::new_v4()), Some(Role::Staff), tx);
        assert!(handle.is_staff());
        assert!(handle.try_send(ServerMessage::Heartbeat).is_ok());
        assert!(handle.try_send(ServerMessage::Heartbeat).is_err());
    }
}
