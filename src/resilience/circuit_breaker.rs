//! Failure-rate circuit breaker.
//!
//! # States
//! - Closed: fewer than `max_failures` failures inside the window
//! - Open: endpoint suspended until `now + suspension`
//!
//! # Design Decisions
//! - Per-endpoint breaker (not global)
//! - Approximate sliding window: a fixed set of `max_failures` timestamp
//!   slots, any slot older than the window may be reused, no ordering
//! - Lock-free: slot reuse is a compare-and-swap, suspension a plain store
//! - No half-open state; the deadline expiring (or a health probe) closes it

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::config::FailureRateConfig;
use crate::load_balancer::endpoint::EndpointState;

/// Sliding-window failure detector.
#[derive(Debug, Clone)]
pub struct FailureWindow {
    max_failures: usize,
    window_ms: u64,
    suspension_ms: u64,
}

impl FailureWindow {
    pub fn new(max_failures: usize, window: Duration, suspension: Duration) -> Self {
        Self {
            max_failures,
            window_ms: window.as_millis() as u64,
            suspension_ms: suspension.as_millis() as u64,
        }
    }

    pub fn from_config(config: &FailureRateConfig) -> Self {
        Self {
            max_failures: config.max_failures,
            window_ms: config.window_ms,
            suspension_ms: config.suspension_ms,
        }
    }

    /// Slots each endpoint needs.
    pub fn capacity(&self) -> usize {
        self.max_failures
    }

    pub fn is_enabled(&self) -> bool {
        self.max_failures > 0
    }

    /// Record a failure at `now`. Returns the suspension deadline if this
    /// failure tripped the breaker.
    pub fn record(&self, endpoint: &EndpointState, now: u64) -> Option<u64> {
        if !self.is_enabled() {
            return None;
        }

        let cutoff = now.saturating_sub(self.window_ms);
        let is_stale = |t: u64| t == 0 || t < cutoff;

        let mut recorded = false;
        for slot in endpoint.failure_times.iter() {
            let t = slot.load(Ordering::Relaxed);
            if !is_stale(t) {
                continue;
            }
            if recorded {
                // Room left inside the window.
                return None;
            }
            // Another failure may claim the same slot; keep scanning if so.
            recorded = slot
                .compare_exchange(t, now, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok();
        }

        let deadline = now.saturating_add(self.suspension_ms);
        endpoint.suspend_until(deadline);
        Some(deadline)
    }
}
