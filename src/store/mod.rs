//! Persistence layer.
//!
//! [`Store`] bundles the per-resource traits; [`create_store`] picks the
//! backend named in `database.backend`.

pub mod backend;
pub mod factory;
pub mod memory_backend;
pub mod postgres_backend;

pub use backend::{
    DeleteOutcome, DeliveryStore, MenuStore, OrderStore, PaymentUpdate, SettingsStore, Store,
    StoreError, StoreResult, UserStore,
};
pub use factory::create_store;
pub use memory_backend::MemoryStore;
pub use postgres_backend::PostgresStore;
