//! The load balancer: selection, retry and failure bookkeeping.
//!
//! # Responsibilities
//! - Own the endpoint arena and the selection policy
//! - Drive each logical request through select → invoke → retry-or-finish
//! - Feed outcomes into the failure window and endpoint counters
//! - Start and stop the health monitor

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::config::schema::{BalancerConfig, PolicyKind};
use crate::config::validation::{validate_config, ValidationError};
use crate::config::ConfigError;
use crate::error::{BalancerError, BuildError};
use crate::health::{HealthCheck, HealthMonitor};
use crate::lifecycle::Shutdown;
use crate::load_balancer::clock::{Clock, SystemClock};
use crate::load_balancer::endpoint::{EndpointArena, EndpointSnapshot};
use crate::load_balancer::latency::LatencyBiased;
use crate::load_balancer::round_robin::RoundRobin;
use crate::load_balancer::SelectionPolicy;
use crate::observability::metrics;
use crate::resilience::{FailureWindow, RetryTracker};

/// Client-side load balancer over `endpoint_count` interchangeable endpoints.
///
/// Share it behind an `Arc`; every method takes `&self`. Dropping the
/// balancer stops its health monitor.
pub struct LoadBalancer {
    endpoints: Arc<EndpointArena>,
    policy: Box<dyn SelectionPolicy>,
    policy_kind: PolicyKind,
    breaker: Option<FailureWindow>,
    retries: RetryTracker,
    clock: Arc<dyn Clock>,
    shutdown: Shutdown,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl LoadBalancer {
    /// Create a balancer without health monitoring.
    pub fn new(config: BalancerConfig) -> Result<Self, BuildError> {
        Self::build(config, None, Arc::new(SystemClock))
    }

    /// Create a balancer whose health monitor probes with `check`.
    /// Must be called from within a Tokio runtime.
    pub fn with_health_check(
        config: BalancerConfig,
        check: impl HealthCheck,
    ) -> Result<Self, BuildError> {
        Self::build(config, Some(Arc::new(check)), Arc::new(SystemClock))
    }

    /// Create a balancer with an explicit clock.
    pub fn build(
        config: BalancerConfig,
        check: Option<Arc<dyn HealthCheck>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BuildError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        match (&config.monitor, &check) {
            (Some(_), None) => {
                return Err(ConfigError::Validation(vec![ValidationError::new(
                    "monitor",
                    "a health check probe is required when monitoring is enabled",
                )])
                .into());
            }
            (None, Some(_)) => {
                return Err(ConfigError::Validation(vec![ValidationError::new(
                    "monitor",
                    "a health check probe was supplied without a monitor section",
                )])
                .into());
            }
            _ => {}
        }

        let breaker = config
            .failure_rate
            .as_ref()
            .map(FailureWindow::from_config)
            .filter(FailureWindow::is_enabled);
        let window_capacity = breaker.as_ref().map_or(0, FailureWindow::capacity);
        let endpoints = Arc::new(EndpointArena::new(config.endpoint_count, window_capacity));

        let policy: Box<dyn SelectionPolicy> = match config.policy {
            PolicyKind::RoundRobin => Box::new(RoundRobin::new()),
            PolicyKind::LatencyBiased => Box::new(LatencyBiased::new()),
        };

        let shutdown = Shutdown::new();
        let monitor = match (config.monitor, check) {
            (Some(monitor_config), Some(check)) => {
                let runtime = tokio::runtime::Handle::try_current()?;
                let monitor = Arc::new(HealthMonitor::new(
                    endpoints.clone(),
                    monitor_config,
                    check,
                    clock.clone(),
                ));
                Some(runtime.spawn(monitor.run(shutdown.subscribe())))
            }
            _ => None,
        };

        tracing::info!(
            endpoints = config.endpoint_count,
            retry_count = config.retry_count,
            policy = ?config.policy,
            circuit_breaker = breaker.is_some(),
            health_monitor = monitor.is_some(),
            "Load balancer initialized"
        );

        Ok(Self {
            endpoints,
            policy,
            policy_kind: config.policy,
            breaker,
            retries: RetryTracker::new(config.retry_count),
            clock,
            shutdown,
            monitor: Mutex::new(monitor),
        })
    }

    /// Run `op` against a selected endpoint, ignoring index and attempt.
    pub async fn wrap<T, E, F, Fut>(&self, mut op: F) -> Result<T, BalancerError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.wrap_with(|_, _| op()).await
    }

    /// Run `op` with the selected endpoint index.
    pub async fn wrap_indexed<T, E, F, Fut>(&self, mut op: F) -> Result<T, BalancerError<E>>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.wrap_with(|index, _| op(index)).await
    }

    /// Run `op` with the selected endpoint index and the number of attempts
    /// remaining after this one (counts down to 0 on the final attempt).
    ///
    /// Failed attempts are retried immediately on a freshly selected endpoint
    /// until the retry budget is spent, then the last error is returned as
    /// [`BalancerError::Endpoint`]. If no endpoint is eligible when an
    /// attempt starts the request ends with
    /// [`BalancerError::BackendsExhausted`], whatever budget is left.
    pub async fn wrap_with<T, E, F, Fut>(&self, mut op: F) -> Result<T, BalancerError<E>>
    where
        F: FnMut(usize, u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let request = self.retries.begin();
        let request_id = request.id();

        loop {
            let attempts_remaining = request.next_attempt();

            let Some(index) = self.select() else {
                tracing::warn!(
                    request_id = %request_id,
                    "No eligible endpoints, all backends suspended"
                );
                metrics::record_exhausted();
                return Err(BalancerError::BackendsExhausted);
            };

            tracing::debug!(
                request_id = %request_id,
                endpoint = index,
                attempts_remaining,
                "Dispatching attempt"
            );

            let start = Instant::now();
            match op(index, attempts_remaining).await {
                Ok(value) => {
                    self.register_success(index, start.elapsed());
                    return Ok(value);
                }
                Err(e) => {
                    self.register_failure(index);
                    if attempts_remaining == 0 {
                        tracing::debug!(
                            request_id = %request_id,
                            endpoint = index,
                            "Retry budget spent"
                        );
                        return Err(BalancerError::Endpoint(e));
                    }
                    tracing::info!(
                        request_id = %request_id,
                        endpoint = index,
                        attempts_remaining,
                        "Attempt failed, retrying"
                    );
                }
            }
        }
    }

    fn select(&self) -> Option<usize> {
        self.policy.select(&self.endpoints, self.clock.now_millis())
    }

    fn register_success(&self, index: usize, elapsed: Duration) {
        let endpoint = self.endpoints.get(index);
        endpoint.record_success();
        self.policy.on_success(endpoint, elapsed);
        metrics::record_attempt(index, "success");
        metrics::record_latency(index, elapsed);
    }

    fn register_failure(&self, index: usize) {
        let endpoint = self.endpoints.get(index);
        endpoint.record_failure();
        self.policy.on_failure(endpoint);
        metrics::record_attempt(index, "failure");

        if let Some(breaker) = &self.breaker {
            if let Some(deadline) = breaker.record(endpoint, self.clock.now_millis()) {
                tracing::warn!(
                    endpoint = index,
                    suspended_until = deadline,
                    "Failure rate exceeded, endpoint suspended"
                );
                metrics::record_suspension(index, "failure_rate");
            }
        }
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    pub fn policy(&self) -> PolicyKind {
        self.policy_kind
    }

    /// Whether `index` could be selected right now.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below [`endpoint_count`](Self::endpoint_count).
    pub fn is_eligible(&self, index: usize) -> bool {
        self.endpoints.get(index).is_eligible(self.clock.now_millis())
    }

    /// Logical requests currently holding a retry budget.
    pub fn in_flight(&self) -> usize {
        self.retries.in_flight()
    }

    /// Point-in-time view of every endpoint.
    pub fn snapshot(&self) -> Vec<EndpointSnapshot> {
        let now = self.clock.now_millis();
        self.endpoints
            .iter()
            .map(|(index, endpoint)| endpoint.snapshot(index, now))
            .collect()
    }

    /// Stop the health monitor and wait for its loop to exit. Probes still
    /// running are left to finish; their results are discarded.
    pub async fn shutdown(&self) {
        self.shutdown.trigger();
        let handle = self.monitor.lock().ok().and_then(|mut m| m.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Health monitor task failed");
            }
        }
        tracing::info!("Load balancer shut down");
    }
}

impl std::fmt::Debug for LoadBalancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadBalancer")
            .field("endpoints", &self.endpoints.len())
            .field("policy", &self.policy_kind)
            .field("breaker", &self.breaker)
            .field("in_flight", &self.retries.in_flight())
            .finish_non_exhaustive()
    }
}

impl Drop for LoadBalancer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
