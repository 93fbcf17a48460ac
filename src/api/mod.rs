//! API layer - HTTP endpoint handlers organized by resource.

mod auth;
mod connection;
mod delivery;
mod extract;
mod health;
mod menu;
mod metrics;
mod orders;
mod payment;
mod response;
mod routes;
mod settings;

pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use response::{ApiResponse, Page, Pagination};
pub use routes::api_routes;
