//! Per-endpoint state.
//!
//! # Responsibilities
//! - Hold the counters and deadlines for a single endpoint
//! - Decide eligibility from the suspension deadline
//! - Track probe streaks for the health monitor (hysteresis)
//!
//! Every field is an independent atomic. There is no cross-field
//! transaction: a selection may read a deadline a moment before it changes.

use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// `suspended_until` value of an endpoint that was never suspended.
pub const NOT_SUSPENDED: u64 = 0;

/// `suspended_until` value of an endpoint held down until a probe clears it.
pub const SUSPENDED_INDEFINITELY: u64 = u64::MAX;

/// Latency recorded for an endpoint whose last call failed.
pub const FAILED_LATENCY: u64 = u64::MAX - 1;

/// Health transition caused by a probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    Suspended,
    Cleared,
}

/// State of a single endpoint.
#[derive(Debug)]
pub struct EndpointState {
    /// Eligible for selection iff this is strictly before now.
    pub suspended_until: AtomicU64,
    pub successes: AtomicU64,
    pub failures: AtomicU64,
    /// Sliding failure window slots, 0 meaning empty.
    pub failure_times: Box<[AtomicU64]>,
    /// Last successful call latency (latency-biased selection only).
    pub latency_ms: AtomicU64,
    /// Consecutive failed probes.
    pub unhealthy_streak: AtomicU32,
    /// Consecutive healthy probes.
    pub healthy_streak: AtomicU32,
}

impl EndpointState {
    /// Create an endpoint with `window_capacity` failure slots.
    pub fn new(window_capacity: usize) -> Self {
        Self {
            suspended_until: AtomicU64::new(NOT_SUSPENDED),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            failure_times: (0..window_capacity).map(|_| AtomicU64::new(0)).collect(),
            latency_ms: AtomicU64::new(0),
            unhealthy_streak: AtomicU32::new(0),
            healthy_streak: AtomicU32::new(0),
        }
    }

    pub fn is_eligible(&self, now: u64) -> bool {
        self.suspended_until.load(Ordering::Relaxed) < now
    }

    pub fn suspend_until(&self, deadline: u64) {
        self.suspended_until.store(deadline, Ordering::Relaxed);
    }

    pub fn latency(&self) -> u64 {
        self.latency_ms.load(Ordering::Relaxed)
    }

    // --- Call outcomes ---

    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    // --- Health Logic ---

    /// Report a healthy probe.
    pub fn mark_healthy(&self, healthy_threshold: u32) -> Transition {
        self.unhealthy_streak.store(0, Ordering::Relaxed);

        let streak = self.healthy_streak.fetch_add(1, Ordering::Relaxed) + 1;
        if streak >= healthy_threshold {
            self.healthy_streak.store(0, Ordering::Relaxed);
            let previous = self.suspended_until.swap(NOT_SUSPENDED, Ordering::Relaxed);
            if previous != NOT_SUSPENDED {
                return Transition::Cleared;
            }
        }
        Transition::None
    }

    /// Report an unhealthy or failed probe.
    pub fn mark_unhealthy(&self, unhealthy_threshold: u32) -> Transition {
        self.healthy_streak.store(0, Ordering::Relaxed);

        let streak = self.unhealthy_streak.fetch_add(1, Ordering::Relaxed) + 1;
        if streak >= unhealthy_threshold {
            self.unhealthy_streak.store(0, Ordering::Relaxed);
            let previous = self.suspended_until.swap(SUSPENDED_INDEFINITELY, Ordering::Relaxed);
            if previous != SUSPENDED_INDEFINITELY {
                return Transition::Suspended;
            }
        }
        Transition::None
    }

    pub fn snapshot(&self, index: usize, now: u64) -> EndpointSnapshot {
        let suspended_until = self.suspended_until.load(Ordering::Relaxed);
        let latency = self.latency();
        EndpointSnapshot {
            index,
            eligible: suspended_until < now,
            suspended_until: (suspended_until != NOT_SUSPENDED).then_some(suspended_until),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            latency_ms: (latency != FAILED_LATENCY).then_some(latency),
            unhealthy_streak: self.unhealthy_streak.load(Ordering::Relaxed),
            healthy_streak: self.healthy_streak.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of an endpoint, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointSnapshot {
    pub index: usize,
    pub eligible: bool,
    pub suspended_until: Option<u64>,
    pub successes: u64,
    pub failures: u64,
    pub latency_ms: Option<u64>,
    pub unhealthy_streak: u32,
    pub healthy_streak: u32,
}

/// Fixed set of endpoints addressed by index.
#[derive(Debug)]
pub struct EndpointArena {
    endpoints: Box<[EndpointState]>,
}

impl EndpointArena {
    pub fn new(count: usize, window_capacity: usize) -> Self {
        Self {
            endpoints: (0..count).map(|_| EndpointState::new(window_capacity)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn get(&self, index: usize) -> &EndpointState {
        &self.endpoints[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &EndpointState)> {
        self.endpoints.iter().enumerate()
    }
}
