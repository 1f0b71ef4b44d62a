//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use endpoint_balancer::load_balancer::ManualClock;
use endpoint_balancer::ProbeError;

/// Error returned by scripted endpoint operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("endpoint {index} failed: {reason}")]
pub struct EndpointDown {
    pub index: usize,
    pub reason: &'static str,
}

/// Manual clock starting well past the epoch so empty window slots are stale.
pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(1_700_000_000_000))
}

/// Health probe whose verdict can be flipped from the test.
#[derive(Debug, Clone)]
pub struct ScriptedProbe {
    pub healthy: Arc<AtomicBool>,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedProbe {
    pub fn new(healthy: bool) -> Self {
        Self {
            healthy: Arc::new(AtomicBool::new(healthy)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Closure suitable for `LoadBalancer::with_health_check`.
    pub fn check(
        &self,
    ) -> impl Fn(usize) -> std::future::Ready<Result<bool, ProbeError>> + Send + Sync + 'static {
        let healthy = self.healthy.clone();
        let calls = self.calls.clone();
        move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(healthy.load(Ordering::SeqCst)))
        }
    }
}

/// Poll `condition` until it holds or `limit` elapses.
pub async fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
