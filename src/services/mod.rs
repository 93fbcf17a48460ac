//! Multi-step operations shared by several handlers.

pub mod bootstrap;
pub mod checkout;
pub mod payments;

pub use bootstrap::{ensure_admin, AdminBootstrap};
pub use checkout::{place_order, CreateOrderRequest, OrderLineRequest};
pub use payments::{initialize_payment, reconcile_payment, InitializedPayment, ReconcileOutcome};
