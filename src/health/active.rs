//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every endpoint
//! - Apply hysteresis to probe results and set or clear suspensions

use futures_util::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, MissedTickBehavior};

use crate::config::MonitorConfig;
use crate::error::ProbeError;
use crate::load_balancer::clock::Clock;
use crate::load_balancer::endpoint::{EndpointArena, Transition};
use crate::observability::metrics;

/// Future returned by a health probe: `Ok(true)` when the endpoint is healthy.
pub type ProbeFuture = Pin<Box<dyn Future<Output = Result<bool, ProbeError>> + Send>>;

/// Caller-supplied health probe.
pub trait HealthCheck: Send + Sync + 'static {
    fn probe(&self, index: usize) -> ProbeFuture;
}

impl<F, Fut> HealthCheck for F
where
    F: Fn(usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, ProbeError>> + Send + 'static,
{
    fn probe(&self, index: usize) -> ProbeFuture {
        Box::pin(self(index))
    }
}

pub struct HealthMonitor {
    endpoints: Arc<EndpointArena>,
    config: MonitorConfig,
    check: Arc<dyn HealthCheck>,
    clock: Arc<dyn Clock>,
    stopped: AtomicBool,
}

impl HealthMonitor {
    pub fn new(
        endpoints: Arc<EndpointArena>,
        config: MonitorConfig,
        check: Arc<dyn HealthCheck>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            endpoints,
            config,
            check,
            clock,
            stopped: AtomicBool::new(false),
        }
    }

    /// Probe until shutdown.
    ///
    /// Rounds start at a fixed rate, the first one immediately. A round only
    /// launches its probes and never waits for them, so a probe that does
    /// not settle delays nothing but its own result. Results that arrive
    /// after shutdown are discarded.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_ms = self.config.interval_ms,
            unhealthy_threshold = self.config.unhealthy_threshold,
            healthy_threshold = self.config.healthy_threshold,
            endpoints = self.endpoints.len(),
            "Health monitor starting"
        );

        let mut ticker = time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
                _ = ticker.tick() => {
                    self.spawn_round();
                }
            }
        }
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Run one probe round and wait for every result.
    pub async fn check_all(self: &Arc<Self>) {
        let mut round: FuturesUnordered<_> = self.spawn_round().into_iter().collect();
        while let Some(result) = round.next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Health result task failed");
            }
        }
    }

    /// Launch one probe per endpoint. Each probe runs in its own task so a
    /// panicking probe counts as a failed one; a second task applies the
    /// result unless the monitor has stopped by then.
    fn spawn_round(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        self.endpoints
            .iter()
            .map(|(index, _)| {
                let check = self.check.clone();
                let probe = tokio::spawn(async move { check.probe(index).await });
                let monitor = Arc::clone(self);
                tokio::spawn(async move {
                    let outcome = probe.await;
                    if monitor.stopped.load(Ordering::SeqCst) {
                        tracing::debug!(endpoint = index, "Discarding health result after shutdown");
                        return;
                    }
                    monitor.apply(index, outcome);
                })
            })
            .collect()
    }

    fn apply(&self, index: usize, outcome: Result<Result<bool, ProbeError>, JoinError>) {
        let healthy = match outcome {
            Ok(Ok(true)) => true,
            Ok(Ok(false)) => {
                tracing::debug!(endpoint = index, "Health check reported unhealthy");
                false
            }
            Ok(Err(e)) => {
                tracing::warn!(endpoint = index, error = %e, "Health check failed");
                false
            }
            Err(e) => {
                tracing::warn!(endpoint = index, error = %e, "Health probe task failed");
                false
            }
        };

        let endpoint = self.endpoints.get(index);
        let transition = if healthy {
            endpoint.mark_healthy(self.config.healthy_threshold)
        } else {
            endpoint.mark_unhealthy(self.config.unhealthy_threshold)
        };

        match transition {
            Transition::Suspended => {
                tracing::warn!(endpoint = index, "Endpoint suspended by health monitor");
                metrics::record_suspension(index, "health_check");
            }
            Transition::Cleared => {
                tracing::info!(endpoint = index, "Endpoint restored by health monitor");
            }
            Transition::None => {}
        }

        metrics::record_endpoint_health(index, endpoint.is_eligible(self.clock.now_millis()));
    }
}
