use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::server::AppState;

use super::{auth, connection, delivery, health, menu, metrics, orders, payment, settings};

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/profile", put(auth::update_profile))
        .route("/password", put(auth::change_password))
        .route("/users", get(auth::list_users))
        .route("/users/{id}/role", patch(auth::update_user_role))
}

fn menu_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(menu::list_items).post(menu::create_item))
        .route(
            "/categories",
            get(menu::list_categories).post(menu::create_category),
        )
        .route(
            "/categories/{id}",
            put(menu::update_category).delete(menu::delete_category),
        )
        .route(
            "/{id}",
            get(menu::get_item)
                .put(menu::update_item)
                .delete(menu::delete_item),
        )
        .route("/{id}/availability", patch(menu::set_availability))
}

fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(delivery::list_locations).post(delivery::create_location),
        )
        .route(
            "/areas/{area_id}",
            put(delivery::update_area).delete(delivery::delete_area),
        )
        .route(
            "/{id}",
            get(delivery::get_location)
                .put(delivery::update_location)
                .delete(delivery::delete_location),
        )
        .route("/{id}/status", patch(delivery::set_location_status))
        .route(
            "/{id}/areas",
            get(delivery::list_areas).post(delivery::create_area),
        )
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list_orders).post(orders::create_order))
        .route("/my", get(orders::my_orders))
        .route("/stats", get(orders::order_stats))
        .route("/track/{order_number}", get(orders::track_order))
        .route("/{id}", get(orders::get_order))
        .route("/{id}/status", patch(orders::update_status))
        .route("/{id}/cancel", post(orders::cancel_order))
}

fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/initialize", post(payment::initialize))
        .route("/verify/{reference}", get(payment::verify))
        .route("/webhook", post(payment::webhook))
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health, stats & metrics
        .route("/health", get(health::health))
        .route("/stats", get(health::stats))
        .route("/metrics", get(metrics::prometheus_metrics))
        .nest(
            "/api",
            Router::new()
                .nest("/auth", auth_routes())
                .nest("/menu", menu_routes())
                .nest("/delivery-locations", delivery_routes())
                .nest("/orders", order_routes())
                .nest("/payment", payment_routes())
                .route(
                    "/settings",
                    get(settings::get_settings).put(settings::update_settings),
                )
                .route("/realtime/rooms", get(connection::list_rooms))
                .route("/realtime/rooms/{name}", get(connection::get_room)),
        )
}
