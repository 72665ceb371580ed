//! Periodic probe rounds
//!
//! Each tick probes every registered monitor through `check_now`, with at
//! most `max_concurrent` probes in flight. Overrunning rounds delay the next
//! tick instead of stacking up.

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::contracts::HealthStatus;
use crate::service::MonitoringService;

/// Counts from one probe round
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundSummary {
    pub probed: usize,
    /// Monitors removed while the round was running
    pub skipped: usize,
    pub by_status: HashMap<HealthStatus, usize>,
    pub duration_ms: u64,
}

impl RoundSummary {
    pub fn count(&self, status: HealthStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

pub struct ProbeScheduler {
    service: Arc<MonitoringService>,
    every: Duration,
    max_concurrent: usize,
}

impl ProbeScheduler {
    pub fn new(service: Arc<MonitoringService>, every: Duration, max_concurrent: usize) -> Self {
        Self {
            service,
            every,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Probe every registered monitor once
    pub async fn run_round(&self) -> RoundSummary {
        let start = Instant::now();
        let ids: Vec<_> = self
            .service
            .registry()
            .list(None)
            .await
            .into_iter()
            .map(|m| m.id)
            .collect();

        let outcomes: Vec<_> = stream::iter(ids)
            .map(|id| {
                let service = self.service.clone();
                async move { service.check_now(id).await }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut summary = RoundSummary::default();
        for outcome in outcomes {
            match outcome {
                Ok(checked) => {
                    summary.probed += 1;
                    *summary.by_status.entry(checked.result.status).or_insert(0) += 1;
                }
                Err(e) => {
                    summary.skipped += 1;
                    tracing::debug!(error = %e, "Monitor disappeared during probe round");
                }
            }
        }
        summary.duration_ms = start.elapsed().as_millis() as u64;
        summary
    }

    /// Run rounds until `shutdown` flips to true or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.every.as_secs(),
            max_concurrent = self.max_concurrent,
            "Probe scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let summary = self.run_round().await;
                    tracing::info!(
                        probed = summary.probed,
                        healthy = summary.count(HealthStatus::Healthy),
                        degraded = summary.count(HealthStatus::Degraded),
                        down = summary.count(HealthStatus::Down),
                        unknown = summary.count(HealthStatus::Unknown),
                        duration_ms = summary.duration_ms,
                        "Probe round finished"
                    );
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Probe scheduler stopped");
    }

    /// Spawn the loop on the runtime
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown, receiver) = watch::channel(false);
        let task = tokio::spawn(self.run(receiver));
        SchedulerHandle { shutdown, task }
    }
}

/// Handle to a spawned scheduler
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the loop and wait for the current round to finish
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Probe scheduler task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::contracts::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn service_with(server: &MockServer, monitors: usize) -> Arc<MonitoringService> {
        let service = MonitoringService::new(&ServiceConfig::default()).unwrap();
        for i in 0..monitors {
            let target = ProbeTarget::new(
                ServiceFamily::Keypay,
                Credentials::new().with("apiKey", format!("key-{}", i)),
            )
            .with_endpoint(server.uri());
            service.register(NewMonitor::new("acme", target)).await.unwrap();
        }
        Arc::new(service)
    }

    #[tokio::test]
    async fn test_round_probes_every_monitor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(3)
            .mount(&server)
            .await;

        let service = service_with(&server, 3).await;
        let scheduler = ProbeScheduler::new(service.clone(), Duration::from_secs(60), 2);

        let summary = scheduler.run_round().await;
        assert_eq!(summary.probed, 3);
        assert_eq!(summary.count(HealthStatus::Healthy), 3);

        for monitor in service.registry().list(None).await {
            assert_eq!(monitor.current_status, HealthStatus::Healthy);
        }
    }

    #[tokio::test]
    async fn test_empty_registry_round() {
        let server = MockServer::start().await;
        let service = service_with(&server, 0).await;
        let summary = ProbeScheduler::new(service, Duration::from_secs(60), 4)
            .run_round()
            .await;
        assert_eq!(summary.probed, 0);
        assert_eq!(summary.skipped, 0);
    }

    #[tokio::test]
    async fn test_spawned_scheduler_stops() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let service = service_with(&server, 1).await;
        let handle = ProbeScheduler::new(service.clone(), Duration::from_millis(20), 1).spawn();

        // First tick fires immediately
        for _ in 0..100 {
            let monitors = service.registry().list(None).await;
            if monitors[0].current_status == HealthStatus::Down {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        handle.stop().await;

        let monitors = service.registry().list(None).await;
        assert_eq!(monitors[0].current_status, HealthStatus::Down);
    }
}
