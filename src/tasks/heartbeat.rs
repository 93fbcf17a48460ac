use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::broadcast;
use tokio::time::timeout;

use crate::config::WebSocketConfig;
use crate::connection_manager::ConnectionManager;
use crate::metrics::{RealtimeMetrics, CONNECTIONS_TOTAL, ROOMS_ACTIVE, USERS_CONNECTED};
use crate::websocket::ServerMessage;

/// Timeout for individual heartbeat send operations
const HEARTBEAT_SEND_TIMEOUT_MS: u64 = 5000;

/// Maximum concurrent heartbeat sends
const MAX_CONCURRENT_HEARTBEATS: usize = 1000;

/// Background task for heartbeat and connection cleanup
pub struct HeartbeatTask {
    config: WebSocketConfig,
    connection_manager: Arc<ConnectionManager>,
    shutdown: broadcast::Receiver<()>,
}

impl HeartbeatTask {
    pub fn new(
        config: WebSocketConfig,
        connection_manager: Arc<ConnectionManager>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            connection_manager,
            shutdown,
        }
    }

    /// Run until a shutdown signal arrives
    pub async fn run(mut self) {
        let heartbeat_interval = Duration::from_secs(self.config.heartbeat_interval.max(1));
        let cleanup_interval = Duration::from_secs(self.config.cleanup_interval.max(1));
        let connection_timeout = self.config.connection_timeout;

        let mut heartbeat_timer = tokio::time::interval(heartbeat_interval);
        let mut cleanup_timer = tokio::time::interval(cleanup_interval);

        // Skip immediate first tick
        heartbeat_timer.tick().await;
        cleanup_timer.tick().await;

        tracing::info!(
            heartbeat_interval_secs = self.config.heartbeat_interval,
            cleanup_interval_secs = self.config.cleanup_interval,
            connection_timeout_secs = connection_timeout,
            "Heartbeat task started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Heartbeat task received shutdown signal");
                    break;
                }
                _ = heartbeat_timer.tick() => {
                    self.send_heartbeats().await;
                }
                _ = cleanup_timer.tick() => {
                    self.cleanup_stale_connections(connection_timeout).await;
                }
            }
        }

        tracing::info!("Heartbeat task stopped");
    }

    /// Send a heartbeat to every connection, in bounded batches
    async fn send_heartbeats(&self) {
        let connections = self.connection_manager.get_all_connections();
        self.update_gauges();

        if connections.is_empty() {
            return;
        }

        let start = Instant::now();
        let send_timeout = Duration::from_millis(HEARTBEAT_SEND_TIMEOUT_MS);
        let mut sent = 0usize;
        let mut failed = 0usize;

        for batch in connections.chunks(MAX_CONCURRENT_HEARTBEATS) {
            let results = join_all(
                batch
                    .iter()
                    .map(|handle| timeout(send_timeout, handle.send(ServerMessage::Heartbeat))),
            )
            .await;

            for result in results {
                match result {
                    Ok(Ok(())) => sent += 1,
                    _ => failed += 1,
                }
            }
        }

        tracing::debug!(
            total = connections.len(),
            sent = sent,
            failed = failed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Heartbeat round completed"
        );
    }

    async fn cleanup_stale_connections(&self, timeout_secs: u64) {
        let removed = self.connection_manager.cleanup_stale_connections(timeout_secs).await;

        if removed > 0 {
            RealtimeMetrics::record_stale_removed(removed as u64);
            tracing::info!(
                removed = removed,
                timeout_secs = timeout_secs,
                "Cleaned up stale connections"
            );
        }
    }

    fn update_gauges(&self) {
        let stats = self.connection_manager.stats();
        CONNECTIONS_TOTAL.set(stats.total_connections as i64);
        USERS_CONNECTED.set(stats.unique_users as i64);
        ROOMS_ACTIVE.set(stats.rooms.len() as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_heartbeat_task_shutdown() {
        let connection_manager = Arc::new(ConnectionManager::new());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task = HeartbeatTask::new(WebSocketConfig::default(), connection_manager, shutdown_rx);
        let handle = tokio::spawn(task.run());

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("Task should complete")
            .expect("Task should not panic");
    }

    #[tokio::test]
    async fn test_heartbeat_sends_to_connections() {
        let config = WebSocketConfig {
            heartbeat_interval: 1,
            connection_timeout: 60,
            cleanup_interval: 60,
            ..Default::default()
        };
        let connection_manager = Arc::new(ConnectionManager::new());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let (tx, mut rx) = mpsc::channel::<ServerMessage>(10);
        let _handle = connection_manager.register(None, None, tx);

        let task = HeartbeatTask::new(config, connection_manager, shutdown_rx);
        let task_handle = tokio::spawn(task.run());

        let msg = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("Should receive heartbeat")
            .expect("Channel should not be closed");
        assert!(matches!(msg, ServerMessage::Heartbeat));

        shutdown_tx.send(()).unwrap();
        let _ = task_handle.await;
    }
}
