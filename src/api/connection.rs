//! Realtime room inspection for staff.

use axum::extract::State;
use serde::Serialize;

use crate::auth::AuthUser;
use crate::connection_manager::RoomInfo;
use crate::error::{AppError, Result};
use crate::server::AppState;

use super::extract::ApiPath;
use super::response::ApiResponse;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListResponse {
    pub rooms: Vec<RoomInfo>,
    pub total_rooms: usize,
}

/// GET /api/realtime/rooms
#[tracing::instrument(name = "http.realtime.rooms", skip(state, auth), fields(user_id = %auth.id))]
pub async fn list_rooms(State(state): State<AppState>, auth: AuthUser) -> Result<ApiResponse<RoomListResponse>> {
    auth.require_staff()?;

    let rooms = state.connection_manager.list_rooms();
    let total_rooms = rooms.len();
    Ok(ApiResponse::ok(RoomListResponse { rooms, total_rooms }))
}

/// GET /api/realtime/rooms/{name}
#[tracing::instrument(name = "http.realtime.room", skip(state, auth), fields(user_id = %auth.id))]
pub async fn get_room(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(name): ApiPath<String>,
) -> Result<ApiResponse<RoomInfo>> {
    auth.require_staff()?;

    let member_count = state.connection_manager.get_room_connections(&name).len();
    if member_count == 0 {
        return Err(AppError::NotFound(format!("Room '{}' has no members", name)));
    }
    Ok(ApiResponse::ok(RoomInfo { name, member_count }))
}
