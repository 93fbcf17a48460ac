use std::sync::Arc;
use std::time::Instant;

use crate::auth::JwtService;
use crate::config::Settings;
use crate::connection_manager::ConnectionManager;
use crate::payment::PaymentGateway;
use crate::realtime::EventDispatcher;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub jwt: Arc<JwtService>,
    pub store: Arc<dyn Store>,
    pub payment_gateway: Arc<dyn PaymentGateway>,
    pub connection_manager: Arc<ConnectionManager>,
    pub dispatcher: Arc<EventDispatcher>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(settings: Settings, store: Arc<dyn Store>, payment_gateway: Arc<dyn PaymentGateway>) -> Self {
        let jwt = Arc::new(JwtService::new(&settings.jwt));
        let connection_manager = Arc::new(ConnectionManager::new());
        let dispatcher = Arc::new(EventDispatcher::new(connection_manager.clone()));

        Self {
            settings: Arc::new(settings),
            jwt,
            store,
            payment_gateway,
            connection_manager,
            dispatcher,
            started_at: Instant::now(),
        }
    }
}
