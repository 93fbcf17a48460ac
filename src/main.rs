use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use food_order_service::config::Settings;
use food_order_service::connection_manager::ConnectionManager;
use food_order_service::payment::{MonnifyClient, PaymentGateway};
use food_order_service::postgres::PostgresPool;
use food_order_service::server::{create_app, AppState};
use food_order_service::services::ensure_admin;
use food_order_service::shutdown::GracefulShutdown;
use food_order_service::store::create_store;
use food_order_service::tasks::HeartbeatTask;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    init_tracing();

    // Load configuration
    let settings = Settings::new().context("Failed to load configuration")?;
    tracing::info!(backend = %settings.database.backend, "Configuration loaded");

    // Connect to PostgreSQL when it backs the store
    let postgres_pool = if settings.database.backend == "postgres" {
        let pool = PostgresPool::new(&settings.database)
            .await
            .context("Failed to connect to PostgreSQL")?;
        tracing::info!(url = %pool.database_url_masked(), "Connected to PostgreSQL");

        if settings.database.run_migrations {
            pool.run_migrations().await.context("Failed to run migrations")?;
            tracing::info!("Database migrations applied");
        }
        Some(pool)
    } else {
        None
    };

    let store = create_store(&settings.database, postgres_pool.as_ref());
    let payment_gateway: Arc<dyn PaymentGateway> =
        Arc::new(MonnifyClient::new(&settings.monnify).context("Failed to build payment client")?);

    ensure_admin(store.as_ref(), &settings.admin)
        .await
        .context("Failed to bootstrap administrator")?;

    // Create application state
    let state = AppState::new(settings.clone(), store, payment_gateway);
    tracing::info!("Application state initialized");

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start heartbeat task in background
    let heartbeat_task = HeartbeatTask::new(
        settings.websocket.clone(),
        state.connection_manager.clone(),
        shutdown_tx.subscribe(),
    );
    let heartbeat_handle = tokio::spawn(async move {
        heartbeat_task.run().await;
    });

    let connection_manager = state.connection_manager.clone();
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(connection_manager, shutdown_tx))
        .await?;

    tracing::info!("Waiting for background tasks to finish...");
    let _ = heartbeat_handle.await;

    if let Some(pool) = postgres_pool {
        pool.close().await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` picks the filter (default `info`); `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal_handler(
    connection_manager: Arc<ConnectionManager>,
    shutdown_tx: broadcast::Sender<()>,
) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let reason = tokio::select! {
        _ = ctrl_c => "interrupt",
        _ = terminate => "terminate",
    };
    tracing::info!(signal = reason, "Shutdown signal received");

    GracefulShutdown::new(connection_manager, shutdown_tx)
        .execute("Server is restarting")
        .await;
}
