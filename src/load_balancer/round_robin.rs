//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::load_balancer::endpoint::EndpointArena;
use crate::load_balancer::SelectionPolicy;

/// Round-robin selector.
///
/// One cursor is shared by every caller, so rotation is fair across all
/// concurrent requests combined rather than per request.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw cursor value the next selection starts from.
    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }
}

impl SelectionPolicy for RoundRobin {
    fn select(&self, endpoints: &EndpointArena, now: u64) -> Option<usize> {
        if endpoints.is_empty() {
            return None;
        }
        let len = endpoints.len();

        // Every probe advances the shared cursor, including skipped ones.
        let mut tried = vec![false; len];
        let mut untried = len;
        while untried > 0 {
            let index = self.counter.fetch_add(1, Ordering::Relaxed) % len;
            if tried[index] {
                continue;
            }
            if endpoints.get(index).is_eligible(now) {
                return Some(index);
            }
            tried[index] = true;
            untried -= 1;
        }
        None
    }
}
