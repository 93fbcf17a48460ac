// Shared infrastructure
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod postgres;

// Domain and persistence
pub mod domain;
pub mod payment;
pub mod services;
pub mod store;

// Realtime
pub mod connection_manager;
pub mod realtime;
pub mod websocket;

// Application layer
pub mod api;
pub mod server;

// Supporting modules
pub mod shutdown;
pub mod tasks;
