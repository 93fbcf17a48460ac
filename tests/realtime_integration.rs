//! Realtime routing tests
//!
//! Register in-process connections with the connection manager, drive the
//! REST API and check which connections receive which events.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use food_order_service::config::Settings;
use food_order_service::connection_manager::ConnectionHandle;
use food_order_service::domain::{DeliveryLocation, MenuItem, Role, User};
use food_order_service::payment::{
    InitResponse, PaymentError, PaymentGateway, TransactionInit, TransactionStatus,
};
use food_order_service::realtime::rooms::{self, RoomDenied};
use food_order_service::server::{create_app, AppState};
use food_order_service::store::MemoryStore;
use food_order_service::websocket::ServerMessage;

struct UnusedGateway;

#[async_trait]
impl PaymentGateway for UnusedGateway {
    async fn init_transaction(&self, _request: &TransactionInit) -> Result<InitResponse, PaymentError> {
        Err(PaymentError::NotConfigured)
    }

    async fn query_transaction(&self, _reference: &str) -> Result<TransactionStatus, PaymentError> {
        Err(PaymentError::NotConfigured)
    }
}

struct Client {
    handle: Arc<ConnectionHandle>,
    rx: mpsc::Receiver<ServerMessage>,
}

impl Client {
    /// Event names received so far, in order.
    fn drain_events(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            if let ServerMessage::Event { event, .. } = msg {
                events.push(event);
            }
        }
        events
    }
}

fn setup() -> (Router, AppState) {
    let state = AppState::new(
        Settings::for_tests(),
        Arc::new(MemoryStore::new()),
        Arc::new(UnusedGateway),
    );
    (create_app(state.clone()), state)
}

/// Register a connection and join its automatic rooms, as the socket handler does.
async fn connect(state: &AppState, user: Option<&User>) -> Client {
    let (tx, rx) = mpsc::channel(32);
    let handle = state
        .connection_manager
        .register(user.map(|u| u.id), user.map(|u| u.role), tx);
    for room in rooms::automatic_rooms(&handle) {
        state.connection_manager.join_room(handle.id, &room).await;
    }
    Client { handle, rx }
}

async fn user_with_token(state: &AppState, role: Role) -> (User, String) {
    let email = format!("{}@example.com", Uuid::new_v4());
    let user = User::new("Socket User", &email, None, "unused".to_string(), role);
    state.store.create_user(&user).await.unwrap();
    let token = state.jwt.issue(&user).unwrap();
    (user, token)
}

async fn call(app: &Router, method: Method, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_order_events_reach_staff_owner_and_trackers() {
    let (app, state) = setup();
    let item = MenuItem::new("Pounded Yam", Decimal::new(1800, 0), None);
    state.store.create_menu_item(&item).await.unwrap();

    let (staff, staff_token) = user_with_token(&state, Role::Staff).await;
    let (customer, customer_token) = user_with_token(&state, Role::Customer).await;
    let (other, _) = user_with_token(&state, Role::Customer).await;

    let mut staff_client = connect(&state, Some(&staff)).await;
    let mut owner_client = connect(&state, Some(&customer)).await;
    let mut other_client = connect(&state, Some(&other)).await;
    let mut guest_tracker = connect(&state, None).await;

    let (status, resp) = call(
        &app,
        Method::POST,
        "/api/orders",
        &customer_token,
        json!({
            "customerName": "Ngozi",
            "customerPhone": "08098765432",
            "orderType": "PICKUP",
            "items": [{ "menuItemId": item.id, "quantity": 1 }],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id: Uuid = resp["data"]["id"].as_str().unwrap().parse().unwrap();

    assert_eq!(staff_client.drain_events(), vec!["order:new"]);
    assert!(owner_client.drain_events().is_empty());
    assert!(other_client.drain_events().is_empty());

    let order_room = rooms::order(order_id);
    assert!(rooms::authorize(&order_room, &guest_tracker.handle).is_ok());
    state
        .connection_manager
        .join_room(guest_tracker.handle.id, &order_room)
        .await;

    let (status, _) = call(
        &app,
        Method::PATCH,
        &format!("/api/orders/{}/status", order_id),
        &staff_token,
        json!({ "status": "CONFIRMED" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(staff_client.drain_events(), vec!["order:statusUpdate"]);
    assert_eq!(owner_client.drain_events(), vec!["order:statusUpdate"]);
    assert_eq!(guest_tracker.drain_events(), vec!["order:statusUpdate"]);
    assert!(other_client.drain_events().is_empty());
}

#[tokio::test]
async fn test_catalog_changes_are_broadcast() {
    let (app, state) = setup();
    let item = MenuItem::new("Moi Moi", Decimal::new(700, 0), None);
    state.store.create_menu_item(&item).await.unwrap();
    let location = DeliveryLocation::new("Surulere", Decimal::new(600, 0));
    state.store.create_location(&location).await.unwrap();
    let (_, manager_token) = user_with_token(&state, Role::Manager).await;

    let mut guest = connect(&state, None).await;
    let (customer, _) = user_with_token(&state, Role::Customer).await;
    let mut customer_client = connect(&state, Some(&customer)).await;

    let (status, _) = call(
        &app,
        Method::PATCH,
        &format!("/api/menu/{}/availability", item.id),
        &manager_token,
        json!({ "available": false }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        &app,
        Method::PUT,
        "/api/settings",
        &manager_token,
        json!({ "acceptingOrders": false }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        &app,
        Method::PATCH,
        &format!("/api/delivery-locations/{}/status", location.id),
        &manager_token,
        json!({ "isActive": false }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let expected = vec![
        "menu:availabilityChanged",
        "settings:updated",
        "delivery:statusChanged",
    ];
    assert_eq!(guest.drain_events(), expected);
    assert_eq!(customer_client.drain_events(), expected);
}

#[tokio::test]
async fn test_private_rooms_are_refused() {
    let (_, state) = setup();
    let (customer, _) = user_with_token(&state, Role::Customer).await;
    let client = connect(&state, Some(&customer)).await;
    let guest = connect(&state, None).await;

    assert_eq!(rooms::authorize(rooms::STAFF, &client.handle), Err(RoomDenied::Forbidden));
    assert_eq!(
        rooms::authorize(&rooms::user(Uuid::new_v4()), &client.handle),
        Err(RoomDenied::Forbidden)
    );
    assert!(rooms::authorize(&rooms::user(customer.id), &client.handle).is_ok());
    assert_eq!(rooms::authorize("kitchen", &guest.handle), Err(RoomDenied::Unknown));

    let stats = state.connection_manager.stats();
    assert_eq!(stats.total_connections, 2);
    assert_eq!(stats.guest_connections, 1);
    assert_eq!(stats.rooms.get(&rooms::user(customer.id)), Some(&1));
}
