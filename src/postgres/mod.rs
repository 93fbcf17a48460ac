//! PostgreSQL connection pooling and schema migrations.

pub mod pool;

pub use pool::{PostgresPool, PostgresPoolError};
