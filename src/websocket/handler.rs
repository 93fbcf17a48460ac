use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::auth::{authenticate, AuthUser};
use crate::connection_manager::ConnectionHandle;
use crate::metrics::{WsMessageMetrics, WS_CONNECTIONS_CLOSED, WS_CONNECTIONS_OPENED, WS_CONNECTION_DURATION};
use crate::realtime::rooms::{self, RoomDenied};
use crate::server::AppState;

use super::message::{ClientMessage, ServerMessage};

/// Upper bound on rooms a single connection may hold
const MAX_ROOMS_PER_CONNECTION: usize = 50;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// WebSocket upgrade handler.
///
/// The token is optional; guests connect anonymously and may only track
/// orders. A token that is supplied but invalid is rejected with 401.
#[tracing::instrument(
    name = "ws.upgrade",
    skip(ws, state, query, headers),
    fields(has_query_token = query.token.is_some())
)]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
) -> Response {
    let user = match extract_token(&query, &headers) {
        Some(token) => match authenticate(&token, &state.jwt) {
            Ok(user) => Some(user),
            Err(e) => return e.into_response(),
        },
        None => None,
    };

    tracing::info!(user_id = ?user.as_ref().map(|u| u.id), "WebSocket upgrade requested");

    ws.on_upgrade(move |socket| handle_socket(socket, state, user))
}

/// Extract token from query parameter or Authorization header
fn extract_token(query: &WsQuery, headers: &HeaderMap) -> Option<String> {
    if let Some(ref token) = query.token {
        if !token.is_empty() {
            return Some(token.clone());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Handle an established WebSocket connection
#[tracing::instrument(
    name = "ws.connection",
    skip(socket, state, user),
    fields(user_id = ?user.as_ref().map(|u| u.id))
)]
async fn handle_socket(socket: WebSocket, state: AppState, user: Option<AuthUser>) {
    let connection_start = std::time::Instant::now();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(state.settings.websocket.channel_buffer.max(1));

    let handle = state.connection_manager.register(
        user.as_ref().map(|u| u.id),
        user.as_ref().map(|u| u.role),
        tx,
    );
    let connection_id = handle.id;
    WS_CONNECTIONS_OPENED.inc();

    for room in rooms::automatic_rooms(&handle) {
        state.connection_manager.join_room(connection_id, &room).await;
    }

    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Task for sending messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, ServerMessage::Shutdown { .. });
            let text = match serde_json::to_string(&msg) {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize message");
                    continue;
                }
            };

            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
            if closing {
                let _ = ws_sender.send(Message::Close(None)).await;
                break;
            }
        }
    });

    // Task for receiving messages from WebSocket
    let state_clone = state.clone();
    let handle_clone = handle.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(msg) => {
                    if !process_message(msg, &state_clone, &handle_clone).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = send_task => {
            tracing::debug!(connection_id = %connection_id, "Send task completed");
        }
        _ = recv_task => {
            tracing::debug!(connection_id = %connection_id, "Receive task completed");
        }
    }

    state.connection_manager.unregister(connection_id).await;

    WS_CONNECTIONS_CLOSED.inc();
    let duration = connection_start.elapsed().as_secs_f64();
    WS_CONNECTION_DURATION.observe(duration);

    tracing::info!(
        connection_id = %connection_id,
        duration_secs = duration,
        "WebSocket connection closed"
    );
}

/// Process a received WebSocket message.
/// Returns false if the connection should be closed.
async fn process_message(msg: Message, state: &AppState, handle: &Arc<ConnectionHandle>) -> bool {
    match msg {
        Message::Text(text) => {
            handle.update_activity();

            let client_msg: ClientMessage = match serde_json::from_str(&text) {
                Ok(m) => m,
                Err(e) => {
                    WsMessageMetrics::record_invalid();
                    tracing::warn!(error = %e, "Failed to parse client message");
                    let _ = handle
                        .send(ServerMessage::error("INVALID_MESSAGE", e.to_string()))
                        .await;
                    return true;
                }
            };

            handle_client_message(client_msg, state, handle).await;
            true
        }
        Message::Binary(_) => {
            let _ = handle
                .send(ServerMessage::error(
                    "UNSUPPORTED_FORMAT",
                    "Binary messages are not supported",
                ))
                .await;
            true
        }
        Message::Ping(_) | Message::Pong(_) => {
            handle.update_activity();
            true
        }
        Message::Close(_) => {
            tracing::debug!(connection_id = %handle.id, "Received close frame");
            false
        }
    }
}

#[tracing::instrument(
    name = "ws.message",
    skip(state, handle),
    fields(connection_id = %handle.id, message_type = ?msg)
)]
async fn handle_client_message(msg: ClientMessage, state: &AppState, handle: &Arc<ConnectionHandle>) {
    match msg {
        ClientMessage::Subscribe { rooms } => {
            WsMessageMetrics::record_subscribe();
            handle_subscribe(rooms, state, handle).await;
        }
        ClientMessage::Unsubscribe { rooms } => {
            WsMessageMetrics::record_unsubscribe();
            handle_unsubscribe(rooms, state, handle).await;
        }
        ClientMessage::Ping => {
            WsMessageMetrics::record_ping();
            let _ = handle.send(ServerMessage::Pong).await;
        }
    }
}

async fn handle_subscribe(requested: Vec<String>, state: &AppState, handle: &Arc<ConnectionHandle>) {
    let mut joined = Vec::new();
    let mut errors = Vec::new();

    for room in requested {
        if let Err(denied) = rooms::authorize(&room, handle) {
            tracing::warn!(connection_id = %handle.id, room = %room, reason = ?denied, "Room refused");
            errors.push(match denied {
                RoomDenied::Forbidden => format!("Not allowed to join room: {}", room),
                RoomDenied::Unknown => format!("Unknown room: {}", room),
            });
            continue;
        }

        if handle.room_count().await >= MAX_ROOMS_PER_CONNECTION && !handle.rooms.read().await.contains(&room) {
            errors.push(format!("Room limit of {} reached", MAX_ROOMS_PER_CONNECTION));
            break;
        }

        if state.connection_manager.join_room(handle.id, &room).await {
            joined.push(room);
        }
    }

    if !joined.is_empty() {
        let _ = handle.send(ServerMessage::Subscribed { rooms: joined }).await;
    }
    if !errors.is_empty() {
        let _ = handle
            .send(ServerMessage::error("SUBSCRIPTION_ERROR", errors.join("; ")))
            .await;
    }
}

async fn handle_unsubscribe(requested: Vec<String>, state: &AppState, handle: &Arc<ConnectionHandle>) {
    // Automatic rooms cannot be left
    let automatic = rooms::automatic_rooms(handle);
    let mut left = Vec::new();

    for room in requested {
        if automatic.contains(&room) {
            continue;
        }
        state.connection_manager.leave_room(handle.id, &room).await;
        left.push(room);
    }

    let _ = handle.send(ServerMessage::Unsubscribed { rooms: left }).await;
}
