//! Retry budget tracking.
//!
//! # Responsibilities
//! - Give every logical request its own identity and retry budget
//! - Count the budget down once per attempt
//! - Drop the bookkeeping exactly when the request settles
//!
//! # Design Decisions
//! - Budget keyed by an explicit request id, never by closure identity
//! - Entry removal is tied to a guard, so a cancelled request cannot leak
//! - No backoff between attempts

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identity of one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Remaining retries of every in-flight logical request.
#[derive(Debug, Clone)]
pub struct RetryTracker {
    budget: u32,
    in_flight: Arc<DashMap<RequestId, u32>>,
}

impl RetryTracker {
    pub fn new(budget: u32) -> Self {
        Self {
            budget,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Start tracking a new logical request.
    pub fn begin(&self) -> RequestGuard {
        RequestGuard {
            id: RequestId::new(),
            in_flight: self.in_flight.clone(),
            budget: self.budget,
        }
    }

    /// Number of logical requests currently holding a budget entry.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    #[cfg(test)]
    pub fn remaining(&self, id: &RequestId) -> Option<u32> {
        self.in_flight.get(id).map(|r| *r.value())
    }
}

/// Budget entry of one logical request. Removed on drop.
#[derive(Debug)]
pub struct RequestGuard {
    id: RequestId,
    in_flight: Arc<DashMap<RequestId, u32>>,
    budget: u32,
}

impl RequestGuard {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Attempts remaining after the one about to start. The first call
    /// returns the full budget, every later call one less.
    pub fn next_attempt(&self) -> u32 {
        let remaining = self
            .in_flight
            .entry(self.id)
            .and_modify(|r| {
                debug_assert!(*r > 0, "attempt started with no retry budget left");
                *r = r.saturating_sub(1);
            })
            .or_insert(self.budget);
        *remaining
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.id);
    }
}
