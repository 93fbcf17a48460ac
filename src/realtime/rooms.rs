//! Room names and membership rules.
//!
//! - `staff`: ADMIN/MANAGER/STAFF connections, joined automatically
//! - `user:{id}`: every connection of a signed-in user, joined automatically
//! - `order:{id}`: anyone tracking an order, joined on request

use uuid::Uuid;

use crate::connection_manager::ConnectionHandle;

pub const STAFF: &str = "staff";

pub fn user(user_id: Uuid) -> String {
    format!("user:{}", user_id)
}

pub fn order(order_id: Uuid) -> String {
    format!("order:{}", order_id)
}

/// Why a subscribe request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomDenied {
    /// Room name is not one we know
    Unknown,
    /// Room exists but this connection may not join it
    Forbidden,
}

/// Decide whether `handle` may join `room` on request.
pub fn authorize(room: &str, handle: &ConnectionHandle) -> Result<(), RoomDenied> {
    if room == STAFF {
        return if handle.is_staff() {
            Ok(())
        } else {
            Err(RoomDenied::Forbidden)
        };
    }

    if let Some(id) = room.strip_prefix("user:") {
        let id = Uuid::parse_str(id).map_err(|_| RoomDenied::Unknown)?;
        return if handle.user_id == Some(id) {
            Ok(())
        } else {
            Err(RoomDenied::Forbidden)
        };
    }

    if let Some(id) = room.strip_prefix("order:") {
        return Uuid::parse_str(id).map(|_| ()).map_err(|_| RoomDenied::Unknown);
    }

    Err(RoomDenied::Unknown)
}

/// Rooms a connection joins as soon as it is established.
pub fn automatic_rooms(handle: &ConnectionHandle) -> Vec<String> {
    let mut rooms = Vec::new();
    if let Some(user_id) = handle.user_id {
        rooms.push(user(user_id));
    }
    if handle.is_staff() {
        rooms.push(STAFF.to_string());
    }
    rooms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use tokio::sync::mpsc;

    fn handle(user_id: Option<Uuid>, role: Option<Role>) -> ConnectionHandle {
        ConnectionHandle::new(user_id, role, mpsc::channel(1).0)
    }

    #[test]
    fn test_guest_may_track_orders_only() {
        let guest = handle(None, None);
        assert!(authorize(&order(Uuid::new_v4()), &guest).is_ok());
        assert_eq!(authorize(STAFF, &guest), Err(RoomDenied::Forbidden));
        assert_eq!(authorize(&user(Uuid::new_v4()), &guest), Err(RoomDenied::Forbidden));
        assert_eq!(authorize("order:not-a-uuid", &guest), Err(RoomDenied::Unknown));
        assert_eq!(authorize("lobby", &guest), Err(RoomDenied::Unknown));
    }

    #[test]
    fn test_users_only_join_their_own_room() {
        let id = Uuid::new_v4();
        let customer = handle(Some(id), Some(Role::Customer));
        assert!(authorize(&user(id), &customer).is_ok());
        assert_eq!(authorize(&user(Uuid::new_v4()), &customer), Err(RoomDenied::Forbidden));
        assert_eq!(authorize(STAFF, &customer), Err(RoomDenied::Forbidden));
    }

    #[test]
    fn test_automatic_rooms() {
        let id = Uuid::new_v4();
        assert_eq!(automatic_rooms(&handle(Some(id), Some(Role::Manager))), vec![user(id), STAFF.to_string()]);
        assert_eq!(automatic_rooms(&handle(Some(id), Some(Role::Customer))), vec![user(id)]);
        assert!(automatic_rooms(&handle(None, None)).is_empty());
    }
}
