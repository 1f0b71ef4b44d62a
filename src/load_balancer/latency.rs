//! Latency-biased load balancing strategy.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::load_balancer::endpoint::{EndpointArena, EndpointState, FAILED_LATENCY};
use crate::load_balancer::SelectionPolicy;

/// Latency-biased selector.
/// Selects the eligible endpoint with the lowest last observed latency.
#[derive(Debug, Default)]
pub struct LatencyBiased;

impl LatencyBiased {
    pub fn new() -> Self {
        Self
    }
}

impl SelectionPolicy for LatencyBiased {
    fn select(&self, endpoints: &EndpointArena, now: u64) -> Option<usize> {
        // In case of tie, the first one is selected (stability)
        endpoints
            .iter()
            .filter(|(_, ep)| ep.is_eligible(now))
            .min_by_key(|(_, ep)| ep.latency())
            .map(|(index, _)| index)
    }

    fn on_success(&self, endpoint: &EndpointState, elapsed: Duration) {
        endpoint
            .latency_ms
            .store(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    fn on_failure(&self, endpoint: &EndpointState) {
        // Pinned, not infinite: still selectable when everything else is worse.
        endpoint.latency_ms.store(FAILED_LATENCY, Ordering::Relaxed);
    }
}
