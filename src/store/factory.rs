//! Store backend factory

use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::postgres::PostgresPool;

use super::backend::Store;
use super::memory_backend::MemoryStore;
use super::postgres_backend::PostgresStore;

/// Create a store backend based on configuration.
///
/// - `"postgres"`: a `PostgresStore` when a pool is provided
/// - `"memory"`: a `MemoryStore`, data is lost on restart
///
/// A postgres backend requested without a pool falls back to memory with a
/// warning, so the service can still boot for local development.
pub fn create_store(config: &DatabaseConfig, postgres_pool: Option<&PostgresPool>) -> Arc<dyn Store> {
    match config.backend.as_str() {
        "postgres" => {
            if let Some(pool) = postgres_pool {
                tracing::info!(backend = "postgres", "Creating PostgreSQL store");
                Arc::new(PostgresStore::new(pool.pool().clone()))
            } else {
                tracing::warn!(
                    "PostgreSQL backend requested but no pool provided, falling back to memory"
                );
                Arc::new(MemoryStore::new())
            }
        }
        _ => {
            tracing::info!(backend = "memory", "Creating memory store");
            Arc::new(MemoryStore::new())
        }
    }
}
