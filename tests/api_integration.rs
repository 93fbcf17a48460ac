//! HTTP-level integration tests
//!
//! Drive the full router with `oneshot` against the in-memory store and a
//! stub payment gateway. No database or network access is needed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

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

use food_order_service::config::Settings;
use food_order_service::domain::{DeliveryLocation, MenuItem, PaymentStatus, Role, User};
use food_order_service::payment::{
    sign_webhook_body, GatewayPaymentStatus, InitResponse, PaymentError, PaymentGateway,
    TransactionInit, TransactionStatus, SIGNATURE_HEADER,
};
use food_order_service::realtime::rooms;
use food_order_service::server::{create_app, AppState};
use food_order_service::store::MemoryStore;
use food_order_service::websocket::ServerMessage;

/// Gateway double whose verdict the test controls.
struct StubGateway {
    fail_init: bool,
    status: Mutex<GatewayPaymentStatus>,
    amount_paid: Mutex<Decimal>,
    queries: AtomicUsize,
}

impl StubGateway {
    fn new(fail_init: bool) -> Self {
        Self {
            fail_init,
            status: Mutex::new(GatewayPaymentStatus::Pending),
            amount_paid: Mutex::new(Decimal::ZERO),
            queries: AtomicUsize::new(0),
        }
    }

    fn report(&self, status: GatewayPaymentStatus, amount_paid: Decimal) {
        *self.status.lock().unwrap() = status;
        *self.amount_paid.lock().unwrap() = amount_paid;
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn init_transaction(&self, request: &TransactionInit) -> Result<InitResponse, PaymentError> {
        if self.fail_init {
            return Err(PaymentError::Rejected("Gateway unavailable".to_string()));
        }
        Ok(InitResponse {
            checkout_url: format!("https://checkout.test/{}", request.payment_reference),
            transaction_reference: format!("MNFY|{}", request.payment_reference),
        })
    }

    async fn query_transaction(&self, payment_reference: &str) -> Result<TransactionStatus, PaymentError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(TransactionStatus {
            payment_reference: payment_reference.to_string(),
            transaction_reference: Some(format!("MNFY|{}", payment_reference)),
            payment_status: self.status.lock().unwrap().clone(),
            amount_paid: *self.amount_paid.lock().unwrap(),
        })
    }
}

struct TestApp {
    app: Router,
    state: AppState,
    gateway: Arc<StubGateway>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_gateway(StubGateway::new(false))
    }

    fn with_gateway(gateway: StubGateway) -> Self {
        let gateway = Arc::new(gateway);
        let state = AppState::new(Settings::for_tests(), Arc::new(MemoryStore::new()), gateway.clone());
        Self {
            app: create_app(state.clone()),
            state,
            gateway,
        }
    }

    /// Insert a user directly and return a token for it.
    async fn user_token(&self, role: Role) -> (User, String) {
        let email = format!("{}@example.com", uuid::Uuid::new_v4());
        let user = User::new("Test User", &email, None, "unused".to_string(), role);
        self.state.store.create_user(&user).await.unwrap();
        let token = self.state.jwt.issue(&user).unwrap();
        (user, token)
    }

    async fn seed_menu_item(&self, price: i64) -> MenuItem {
        let item = MenuItem::new("Jollof Rice", Decimal::new(price, 0), None);
        self.state.store.create_menu_item(&item).await.unwrap();
        item
    }

    async fn seed_location(&self, fee: i64) -> DeliveryLocation {
        let location = DeliveryLocation::new("Lekki Phase 1", Decimal::new(fee, 0));
        self.state.store.create_location(&location).await.unwrap();
        location
    }

    async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }
}

fn pickup_order(item: &MenuItem, quantity: u32) -> Value {
    json!({
        "customerName": "Ada Obi",
        "customerEmail": "ada@example.com",
        "customerPhone": "08012345678",
        "orderType": "PICKUP",
        "items": [{ "menuItemId": item.id, "quantity": quantity }],
    })
}

#[tokio::test]
async fn test_register_login_and_me() {
    let t = TestApp::new();
    let body = json!({ "name": "Ada", "email": "Ada@Example.com", "password": "correct-horse" });

    let (status, resp) = t.request(Method::POST, "/api/auth/register", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(resp["success"], true);
    assert_eq!(resp["data"]["user"]["email"], "ada@example.com");
    assert_eq!(resp["data"]["user"]["role"], "CUSTOMER");
    assert!(resp["data"]["user"].get("passwordHash").is_none());

    let (status, resp) = t.request(Method::POST, "/api/auth/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(resp["success"], false);

    let (status, _) = t
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, resp) = t
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ADA@example.com", "password": "correct-horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = resp["data"]["token"].as_str().unwrap().to_string();

    let (status, resp) = t.request(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["name"], "Ada");

    let (status, _) = t.request(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t.request(Method::GET, "/api/auth/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validation() {
    let t = TestApp::new();
    let (status, resp) = t
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Ada", "email": "not-an-email", "password": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["success"], false);

    let (status, resp) = t
        .request(Method::POST, "/api/auth/register", None, Some(json!({ "name": "Ada" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["success"], false);
}

#[tokio::test]
async fn test_user_management_requires_admin() {
    let t = TestApp::new();
    let (_, manager_token) = t.user_token(Role::Manager).await;
    let (_, admin_token) = t.user_token(Role::Admin).await;
    let (customer, _) = t.user_token(Role::Customer).await;

    let (status, _) = t.request(Method::GET, "/api/auth/users", Some(&manager_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, resp) = t.request(Method::GET, "/api/auth/users", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"].as_array().unwrap().len(), 3);

    let uri = format!("/api/auth/users/{}/role", customer.id);
    let (status, resp) = t
        .request(Method::PATCH, &uri, Some(&admin_token), Some(json!({ "role": "STAFF" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["role"], "STAFF");
}

#[tokio::test]
async fn test_menu_crud_and_role_gates() {
    let t = TestApp::new();
    let (_, customer_token) = t.user_token(Role::Customer).await;
    let (_, manager_token) = t.user_token(Role::Manager).await;
    let item = json!({ "name": "Suya Platter", "price": 4500, "description": "Spicy" });

    let (status, _) = t.request(Method::POST, "/api/menu", None, Some(item.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t.request(Method::POST, "/api/menu", Some(&customer_token), Some(item.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, resp) = t.request(Method::POST, "/api/menu", Some(&manager_token), Some(item)).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = resp["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(resp["data"]["available"], true);

    let (status, _) = t
        .request(
            Method::POST,
            "/api/menu",
            Some(&manager_token),
            Some(json!({ "name": "Free Lunch", "price": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t
        .request(
            Method::POST,
            "/api/menu",
            Some(&manager_token),
            Some(json!({ "name": "Gold Plate", "price": 10_000_001 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t
        .request(
            Method::POST,
            "/api/menu",
            Some(&manager_token),
            Some(json!({ "name": "Orphan", "price": 100, "categoryId": uuid::Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, resp) = t.request(Method::GET, &format!("/api/menu/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["name"], "Suya Platter");

    let (status, resp) = t
        .request(
            Method::PATCH,
            &format!("/api/menu/{}/availability", id),
            Some(&manager_token),
            Some(json!({ "available": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["available"], false);

    let (status, resp) = t.request(Method::GET, "/api/menu?available=true", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(resp["data"].as_array().unwrap().is_empty());

    let (status, _) = t
        .request(Method::DELETE, &format!("/api/menu/{}", id), Some(&manager_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, resp) = t.request(Method::GET, &format!("/api/menu/{}", id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(resp["success"], false);

    let (status, _) = t.request(Method::GET, "/api/menu/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_category_in_use_cannot_be_deleted() {
    let t = TestApp::new();
    let (_, manager_token) = t.user_token(Role::Manager).await;

    let (status, resp) = t
        .request(
            Method::POST,
            "/api/menu/categories",
            Some(&manager_token),
            Some(json!({ "name": "Grills", "sortOrder": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = resp["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = t
        .request(
            Method::POST,
            "/api/menu",
            Some(&manager_token),
            Some(json!({ "name": "Asun", "price": 3000, "categoryId": category_id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = t
        .request(
            Method::DELETE,
            &format!("/api/menu/categories/{}", category_id),
            Some(&manager_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, resp) = t.request(Method::GET, "/api/menu/categories", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"][0]["name"], "Grills");
}

#[tokio::test]
async fn test_delivery_location_visibility() {
    let t = TestApp::new();
    let (_, manager_token) = t.user_token(Role::Manager).await;
    let location = t.seed_location(1500).await;

    let (status, resp) = t
        .request(
            Method::POST,
            &format!("/api/delivery-locations/{}/areas", location.id),
            Some(&manager_token),
            Some(json!({ "name": "Admiralty Way", "additionalFee": 250 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let area_id = resp["data"]["id"].as_str().unwrap().to_string();

    let (status, resp) = t.request(Method::GET, "/api/delivery-locations", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"][0]["name"], "Lekki Phase 1");
    assert_eq!(resp["data"][0]["areas"][0]["id"], area_id.as_str());

    let (status, _) = t
        .request(
            Method::PATCH,
            &format!("/api/delivery-locations/{}/status", location.id),
            Some(&manager_token),
            Some(json!({ "isActive": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, resp) = t.request(Method::GET, "/api/delivery-locations", None, None).await;
    assert!(resp["data"].as_array().unwrap().is_empty());

    let (_, resp) = t
        .request(
            Method::GET,
            "/api/delivery-locations?include_inactive=true",
            Some(&manager_token),
            None,
        )
        .await;
    assert_eq!(resp["data"].as_array().unwrap().len(), 1);

    let (status, _) = t
        .request(Method::GET, &format!("/api/delivery-locations/{}", location.id), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cash_order_flow() {
    let t = TestApp::new();
    let item = t.seed_menu_item(2500).await;
    let location = t.seed_location(1000).await;
    let (_, staff_token) = t.user_token(Role::Staff).await;
    let (_, customer_token) = t.user_token(Role::Customer).await;

    let order = json!({
        "customerName": "Ada Obi",
        "customerPhone": "08012345678",
        "orderType": "DELIVERY",
        "deliveryLocationId": location.id,
        "deliveryAddress": "12 Admiralty Way",
        "items": [
            { "menuItemId": item.id, "quantity": 1 },
            { "menuItemId": item.id, "quantity": 1 }
        ],
        "paymentMethod": "CASH",
    });
    let (status, resp) = t.request(Method::POST, "/api/orders", None, Some(order)).await;
    assert_eq!(status, StatusCode::CREATED);
    let data = &resp["data"];
    assert_eq!(data["items"].as_array().unwrap().len(), 1);
    assert_eq!(data["items"][0]["quantity"], 2);
    assert_eq!(data["subtotal"].as_f64(), Some(5000.0));
    assert_eq!(data["deliveryFee"].as_f64(), Some(1000.0));
    assert_eq!(data["total"].as_f64(), Some(6000.0));
    assert_eq!(data["status"], "PENDING");
    let id = data["id"].as_str().unwrap().to_string();
    let number = data["orderNumber"].as_str().unwrap().to_string();

    let (status, _) = t.request(Method::GET, "/api/orders", Some(&customer_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, resp) = t.request(Method::GET, "/api/orders?status=pending", Some(&staff_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["pagination"]["total"], 1);

    let (status, _) = t.request(Method::GET, "/api/orders?status=LOST", Some(&staff_token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let status_uri = format!("/api/orders/{}/status", id);
    let (status, _) = t
        .request(Method::PATCH, &status_uri, Some(&staff_token), Some(json!({ "status": "DELIVERED" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, resp) = t
        .request(Method::PATCH, &status_uri, Some(&staff_token), Some(json!({ "status": "CONFIRMED" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["status"], "CONFIRMED");

    let (status, _) = t
        .request(Method::PATCH, &status_uri, Some(&customer_token), Some(json!({ "status": "PREPARING" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, resp) = t
        .request(Method::GET, &format!("/api/orders/track/{}", number), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["status"], "CONFIRMED");
    assert!(resp["data"].get("customerPhone").is_none());

    let (status, _) = t.request(Method::GET, "/api/orders/track/ORD-NOPE", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_validation() {
    let t = TestApp::new();
    let item = t.seed_menu_item(2500).await;

    let (status, _) = t
        .request(Method::POST, "/api/orders", None, Some(pickup_order(&item, 0)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut online = pickup_order(&item, 1);
    online["paymentMethod"] = json!("ONLINE");
    let (status, _) = t.request(Method::POST, "/api/orders", None, Some(online)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let delivery = json!({
        "customerName": "Ada Obi",
        "customerPhone": "08012345678",
        "orderType": "DELIVERY",
        "items": [{ "menuItemId": item.id, "quantity": 1 }],
    });
    let (status, _) = t.request(Method::POST, "/api/orders", None, Some(delivery)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut unknown = pickup_order(&item, 1);
    unknown["items"][0]["menuItemId"] = json!(uuid::Uuid::new_v4());
    let (status, _) = t.request(Method::POST, "/api/orders", None, Some(unknown)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_order_listing_with_extreme_page() {
    let t = TestApp::new();
    let item = t.seed_menu_item(1200).await;
    let (_, staff_token) = t.user_token(Role::Staff).await;
    let (_, customer_token) = t.user_token(Role::Customer).await;

    let (status, _) = t
        .request(Method::POST, "/api/orders", Some(&customer_token), Some(pickup_order(&item, 1)))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, resp) = t
        .request(Method::GET, "/api/orders?page=4294967295&limit=100", Some(&staff_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(resp["data"]["items"].as_array().unwrap().is_empty());
    assert_eq!(resp["data"]["pagination"]["total"], 1);
    assert_eq!(resp["data"]["pagination"]["page"], 4294967295u64);

    let (status, resp) = t
        .request(Method::GET, "/api/orders/my?page=4294967295", Some(&customer_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(resp["data"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_closed_restaurant_rejects_orders() {
    let t = TestApp::new();
    let item = t.seed_menu_item(2500).await;
    let (_, manager_token) = t.user_token(Role::Manager).await;
    let (_, staff_token) = t.user_token(Role::Staff).await;

    let (status, resp) = t.request(Method::GET, "/api/settings", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["isOpen"], true);

    let (status, _) = t
        .request(Method::PUT, "/api/settings", Some(&staff_token), Some(json!({ "isOpen": false })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t
        .request(
            Method::PUT,
            "/api/settings",
            Some(&manager_token),
            Some(json!({ "minimumOrderAmount": -5 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, resp) = t
        .request(Method::PUT, "/api/settings", Some(&manager_token), Some(json!({ "isOpen": false })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["isOpen"], false);

    let (status, resp) = t
        .request(Method::POST, "/api/orders", None, Some(pickup_order(&item, 1)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["message"].as_str().unwrap().contains("closed"));
}

#[tokio::test]
async fn test_owner_access_and_cancel() {
    let t = TestApp::new();
    let item = t.seed_menu_item(1200).await;
    let (_, owner_token) = t.user_token(Role::Customer).await;
    let (_, other_token) = t.user_token(Role::Customer).await;

    let (status, resp) = t
        .request(Method::POST, "/api/orders", Some(&owner_token), Some(pickup_order(&item, 1)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = resp["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = t.request(Method::GET, &format!("/api/orders/{}", id), Some(&other_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, resp) = t.request(Method::GET, "/api/orders/my", Some(&owner_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["items"].as_array().unwrap().len(), 1);

    let cancel_uri = format!("/api/orders/{}/cancel", id);
    let (status, _) = t.request(Method::POST, &cancel_uri, Some(&other_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, resp) = t.request(Method::POST, &cancel_uri, Some(&owner_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["status"], "CANCELLED");

    let (status, _) = t.request(Method::POST, &cancel_uri, Some(&owner_token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_payment_verification_is_idempotent() {
    let t = TestApp::new();
    let item = t.seed_menu_item(3000).await;

    // A staff socket, to observe order:new
    let (staff, _) = t.user_token(Role::Staff).await;
    let (tx, mut rx) = mpsc::channel(16);
    let handle = t.state.connection_manager.register(Some(staff.id), Some(Role::Staff), tx);
    t.state.connection_manager.join_room(handle.id, rooms::STAFF).await;

    let (status, resp) = t
        .request(Method::POST, "/api/payment/initialize", None, Some(pickup_order(&item, 2)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let reference = resp["data"]["paymentReference"].as_str().unwrap().to_string();
    assert!(resp["data"]["checkoutUrl"].as_str().unwrap().ends_with(&reference));
    assert!(rx.try_recv().is_err());

    let verify_uri = format!("/api/payment/verify/{}", reference);
    let (status, resp) = t.request(Method::GET, &verify_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["paymentStatus"], "PENDING");

    // Short payment leaves the order pending
    t.gateway.report(GatewayPaymentStatus::Paid, Decimal::new(1000, 0));
    let (_, resp) = t.request(Method::GET, &verify_uri, None, None).await;
    assert_eq!(resp["data"]["paymentStatus"], "PENDING");

    t.gateway.report(GatewayPaymentStatus::Paid, Decimal::new(6000, 0));
    let (status, resp) = t.request(Method::GET, &verify_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["paymentStatus"], "PAID");
    assert!(resp["data"]["order"]["paidAt"].is_string());

    let queries = t.gateway.queries.load(Ordering::SeqCst);
    let (_, resp) = t.request(Method::GET, &verify_uri, None, None).await;
    assert_eq!(resp["data"]["paymentStatus"], "PAID");
    assert_eq!(t.gateway.queries.load(Ordering::SeqCst), queries);

    let mut new_orders = 0;
    while let Ok(msg) = rx.try_recv() {
        if let ServerMessage::Event { event, .. } = msg {
            if event == "order:new" {
                new_orders += 1;
            }
        }
    }
    assert_eq!(new_orders, 1);

    let (status, _) = t.request(Method::GET, "/api/payment/verify/FOOD-UNKNOWN", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_payment_initialization_failure_marks_order_failed() {
    let t = TestApp::with_gateway(StubGateway::new(true));
    let item = t.seed_menu_item(3000).await;

    let (status, resp) = t
        .request(Method::POST, "/api/payment/initialize", None, Some(pickup_order(&item, 1)))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(resp["success"], false);

    let (orders, total) = t.state.store.list_orders(&Default::default()).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(orders[0].payment_status, PaymentStatus::Failed);
}

#[tokio::test]
async fn test_webhook_signature_and_reconciliation() {
    let t = TestApp::new();
    let item = t.seed_menu_item(3000).await;

    let (_, resp) = t
        .request(Method::POST, "/api/payment/initialize", None, Some(pickup_order(&item, 1)))
        .await;
    let reference = resp["data"]["paymentReference"].as_str().unwrap().to_string();

    let payload = json!({
        "eventType": "SUCCESSFUL_TRANSACTION",
        "eventData": {
            "paymentReference": reference,
            "transactionReference": "MNFY|WEBHOOK|1",
            "amountPaid": "3000.00",
            "paymentStatus": "PAID"
        }
    })
    .to_string();

    let webhook = |signature: &str| {
        Request::builder()
            .method(Method::POST)
            .uri("/api/payment/webhook")
            .header(header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(payload.clone()))
            .unwrap()
    };

    let (status, _) = t.send(webhook("deadbeef")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let secret = t.state.settings.monnify.secret_key.clone();
    let signature = sign_webhook_body(payload.as_bytes(), &secret);
    let (status, resp) = t.send(webhook(&signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["success"], true);

    let order = t
        .state
        .store
        .find_order_by_payment_reference(&reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.transaction_reference.as_deref(), Some("MNFY|WEBHOOK|1"));

    // Replays are acknowledged without changing anything
    let (status, _) = t.send(webhook(&signature)).await;
    assert_eq!(status, StatusCode::OK);

    let unknown = json!({
        "eventType": "SUCCESSFUL_TRANSACTION",
        "eventData": { "paymentReference": "FOOD-UNKNOWN", "amountPaid": 10 }
    })
    .to_string();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/payment/webhook")
        .header(SIGNATURE_HEADER, sign_webhook_body(unknown.as_bytes(), &secret))
        .body(Body::from(unknown))
        .unwrap();
    let (status, _) = t.send(request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let t = TestApp::new();

    let (status, resp) = t.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["status"], "healthy");
    assert_eq!(resp["store"]["backend"], "memory");

    let response = t
        .app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("food_order_"));
}
