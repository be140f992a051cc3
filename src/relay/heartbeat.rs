//! Heartbeat monitor
//!
//! Each sweep walks a snapshot of the registry. A connection whose liveness
//! flag is still clear from the previous sweep is evicted and terminated;
//! every other connection has its flag cleared and receives a transport-level
//! ping. A pong sets the flag again, so a peer has one full period to answer
//! before the next sweep evicts it.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::registry::ConnectionRegistry;

/// Result of a single sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub probed: usize,
    pub evicted: usize,
}

#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    registry: ConnectionRegistry,
    period: Duration,
}

impl HeartbeatMonitor {
    pub fn new(registry: ConnectionRegistry, period: Duration) -> Self {
        Self { registry, period }
    }

    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();

        for conn in self.registry.snapshot().await {
            if conn.take_alive() {
                // A failed probe is not an eviction trigger; the missing pong is.
                if let Err(e) = conn.probe() {
                    tracing::trace!("Liveness probe not sent: {}", e);
                }
                report.probed += 1;
            } else {
                if self.registry.remove(&conn.id).await.is_some() {
                    tracing::info!(connection_id = %conn.id, "Evicting unresponsive connection");
                    report.evicted += 1;
                }
                conn.terminate();
            }
        }

        if report.evicted > 0 {
            tracing::debug!(
                probed = report.probed,
                evicted = report.evicted,
                "Heartbeat sweep completed"
            );
        } else {
            tracing::trace!(probed = report.probed, "Heartbeat sweep completed");
        }
        report
    }

    /// Run sweeps every period until `shutdown` is cancelled. The first sweep
    /// happens one full period after start.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.period, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::debug!("Heartbeat monitor stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.sweep().await;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::registry::Connection;
    use axum::extract::ws::Message as WsMessage;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    async fn register(
        registry: &ConnectionRegistry,
    ) -> (Arc<Connection>, mpsc::UnboundedReceiver<WsMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Arc::new(Connection::new(Uuid::new_v4(), tx));
        registry.add(conn.clone()).await.unwrap();
        (conn, rx)
    }

    #[tokio::test]
    async fn test_first_sweep_probes() {
        let registry = ConnectionRegistry::new();
        let monitor = HeartbeatMonitor::new(registry.clone(), Duration::from_secs(30));
        let (conn, mut rx) = register(&registry).await;

        let report = monitor.sweep().await;
        assert_eq!(report, SweepReport { probed: 1, evicted: 0 });
        assert!(!conn.is_alive());
        assert!(matches!(rx.try_recv(), Ok(WsMessage::Ping(_))));
    }

    #[tokio::test]
    async fn test_unanswered_probe_evicts_on_next_sweep() {
        let registry = ConnectionRegistry::new();
        let monitor = HeartbeatMonitor::new(registry.clone(), Duration::from_secs(30));
        let (conn, _rx) = register(&registry).await;

        monitor.sweep().await;
        let report = monitor.sweep().await;

        assert_eq!(report, SweepReport { probed: 0, evicted: 1 });
        assert!(!registry.contains(&conn.id).await);
        assert!(conn.is_terminated());
    }

    #[tokio::test]
    async fn test_pong_keeps_connection() {
        let registry = ConnectionRegistry::new();
        let monitor = HeartbeatMonitor::new(registry.clone(), Duration::from_secs(30));
        let (conn, _rx) = register(&registry).await;

        for _ in 0..5 {
            monitor.sweep().await;
            conn.mark_alive();
        }
        assert!(registry.contains(&conn.id).await);
        assert!(!conn.is_terminated());
    }

    #[tokio::test]
    async fn test_probe_send_failure_is_not_eviction() {
        let registry = ConnectionRegistry::new();
        let monitor = HeartbeatMonitor::new(registry.clone(), Duration::from_secs(30));
        let (conn, rx) = register(&registry).await;
        drop(rx);

        let report = monitor.sweep().await;
        assert_eq!(report.probed, 1);
        assert!(registry.contains(&conn.id).await);
    }

    #[tokio::test]
    async fn test_eviction_races_with_close() {
        let registry = ConnectionRegistry::new();
        let monitor = HeartbeatMonitor::new(registry.clone(), Duration::from_secs(30));
        let (conn, _rx) = register(&registry).await;
        monitor.sweep().await;

        // Close path removes first; the eviction that follows is a no-op.
        assert!(registry.remove(&conn.id).await.is_some());
        let report = monitor.sweep().await;
        assert_eq!(report.evicted, 0);
        assert!(registry.remove(&conn.id).await.is_none());
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_monitor_evicts_within_two_periods() {
        let registry = ConnectionRegistry::new();
        let period = Duration::from_secs(30);
        let shutdown = CancellationToken::new();
        let (conn, _rx) = register(&registry).await;

        let handle = HeartbeatMonitor::new(registry.clone(), period).spawn(shutdown.clone());

        tokio::time::sleep(period + Duration::from_secs(1)).await;
        assert!(registry.contains(&conn.id).await);

        tokio::time::sleep(period).await;
        assert!(!registry.contains(&conn.id).await);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_registry_size_with_concurrent_sweep() {
        let registry = ConnectionRegistry::new();
        let monitor = HeartbeatMonitor::new(registry.clone(), Duration::from_secs(30));
        let n = 50;
        let m = 30;

        // Half the connections exist before the sweep; the rest connect
        // while it runs. The first m disconnect, some of them before the
        // sweep reaches them and some right after joining.
        let mut early = Vec::new();
        for _ in 0..n / 2 {
            early.push(register(&registry).await);
        }

        let sweep = {
            let monitor = monitor.clone();
            tokio::spawn(async move { monitor.sweep().await })
        };

        let mut tasks = Vec::new();
        for (i, (conn, rx)) in early.into_iter().enumerate() {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                if i < m {
                    registry.remove(&conn.id).await;
                }
                rx
            }));
        }
        for i in n / 2..n {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let (conn, rx) = register(&registry).await;
                if i < m {
                    registry.remove(&conn.id).await;
                }
                rx
            }));
        }

        let mut receivers = Vec::new();
        for task in tasks {
            receivers.push(task.await.unwrap());
        }
        let report = sweep.await.unwrap();

        // Every connection was alive, so a single sweep never evicts.
        assert_eq!(report.evicted, 0);
        assert_eq!(registry.count().await, n - m);
    }
}
