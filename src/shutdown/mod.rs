//! Graceful shutdown for the realtime side of the service.
//!
//! On shutdown the service:
//! 1. Tells every connected WebSocket client it is going away
//! 2. Signals background tasks (heartbeat) to stop
//! 3. Waits briefly for sockets to close before the listener stops

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::broadcast;
use tokio::time::timeout;

use crate::connection_manager::ConnectionManager;
use crate::websocket::ServerMessage;

#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Time allowed for delivering shutdown notices (default: 5 seconds)
    pub client_notification_timeout: Duration,
    /// Time allowed for sockets to close (default: 10 seconds)
    pub drain_timeout: Duration,
    /// Reconnect hint sent to clients (default: 5 seconds)
    pub reconnect_after_seconds: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            client_notification_timeout: Duration::from_secs(5),
            drain_timeout: Duration::from_secs(10),
            reconnect_after_seconds: 5,
        }
    }
}

pub struct GracefulShutdown {
    connection_manager: Arc<ConnectionManager>,
    shutdown_tx: broadcast::Sender<()>,
    config: ShutdownConfig,
}

impl GracefulShutdown {
    pub fn new(connection_manager: Arc<ConnectionManager>, shutdown_tx: broadcast::Sender<()>) -> Self {
        Self::with_config(connection_manager, shutdown_tx, ShutdownConfig::default())
    }

    pub fn with_config(
        connection_manager: Arc<ConnectionManager>,
        shutdown_tx: broadcast::Sender<()>,
        config: ShutdownConfig,
    ) -> Self {
        Self {
            connection_manager,
            shutdown_tx,
            config,
        }
    }

    #[tracing::instrument(
        name = "graceful_shutdown",
        skip(self),
        fields(total_connections = self.connection_manager.connection_count())
    )]
    pub async fn execute(&self, reason: &str) -> ShutdownResult {
        let start = std::time::Instant::now();
        let mut result = ShutdownResult::default();

        tracing::info!(reason = %reason, "Graceful shutdown: notifying clients");
        result.clients_notified = self.notify_clients(reason).await;

        tracing::info!("Graceful shutdown: stopping background tasks");
        let _ = self.shutdown_tx.send(());

        result.connections_closed = self.wait_for_connections_to_close().await;
        result.duration = start.elapsed();

        tracing::info!(
            clients_notified = result.clients_notified,
            connections_closed = result.connections_closed,
            duration_ms = result.duration.as_millis(),
            "Graceful shutdown completed"
        );

        result
    }

    async fn notify_clients(&self, reason: &str) -> usize {
        let connections = self.connection_manager.get_all_connections();
        if connections.is_empty() {
            return 0;
        }

        let message = ServerMessage::shutdown(reason, Some(self.config.reconnect_after_seconds));
        let mut futures: FuturesUnordered<_> = connections
            .into_iter()
            .map(|conn| {
                let msg = message.clone();
                async move {
                    match timeout(Duration::from_secs(2), conn.send(msg)).await {
                        Ok(Ok(())) => true,
                        Ok(Err(_)) | Err(_) => {
                            tracing::debug!(connection_id = %conn.id, "Shutdown notice not delivered");
                            false
                        }
                    }
                }
            })
            .collect();

        let mut notified = 0;
        let collect = async {
            while let Some(delivered) = futures.next().await {
                if delivered {
                    notified += 1;
                }
            }
        };
        let _ = timeout(self.config.client_notification_timeout, collect).await;

        notified
    }

    async fn wait_for_connections_to_close(&self) -> usize {
        let initial = self.connection_manager.connection_count();
        if initial == 0 {
            return 0;
        }

        let wait = async {
            while self.connection_manager.connection_count() > 0 {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        };
        let _ = timeout(self.config.drain_timeout, wait).await;

        let remaining = self.connection_manager.connection_count();
        if remaining > 0 {
            tracing::warn!(remaining_connections = remaining, "Some connections did not close in time");
        }
        initial.saturating_sub(remaining)
    }
}

#[derive(Debug, Default)]
pub struct ShutdownResult {
    pub clients_notified: usize,
    pub connections_closed: usize,
    pub duration: Duration,
}
