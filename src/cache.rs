//! Async memoizing cache with per-entry expiry.
//!
//! Meant as a decorator around an endpoint operation: the first caller for a
//! key computes the value, concurrent callers for the same key wait for that
//! computation instead of starting their own. Failed computations are not
//! stored; the next caller retries.

use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

#[derive(Debug)]
struct Stored<V> {
    value: V,
    expires_at: Instant,
}

/// One cache entry. The cell is empty while the first computation runs.
#[derive(Debug)]
struct Slot<V> {
    cell: OnceCell<Stored<V>>,
}

impl<V> Slot<V> {
    fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.cell.get().is_some_and(|s| s.expires_at <= now)
    }
}

/// A thread-safe cache of asynchronously computed values.
#[derive(Debug, Clone)]
pub struct AsyncCache<K, V>
where
    K: Eq + Hash,
{
    inner: Arc<DashMap<K, Arc<Slot<V>>>>,
    ttl: Duration,
}

impl<K, V> AsyncCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache whose entries live for `ttl` unless overridden.
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Return the cached value for `key`, or compute and store it.
    pub async fn wrap<E, F, Fut>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.wrap_with_ttl(key, self.ttl, compute).await
    }

    /// Like [`wrap`](Self::wrap), storing a fresh value for `ttl`.
    pub async fn wrap_with_ttl<E, F, Fut>(&self, key: K, ttl: Duration, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.live_slot(&key);
        let result = slot
            .cell
            .get_or_try_init(|| async {
                compute().await.map(|value| Stored {
                    value,
                    expires_at: Instant::now() + ttl,
                })
            })
            .await;

        match result {
            Ok(stored) => Ok(stored.value.clone()),
            Err(e) => {
                // Drop the empty slot unless another caller is waiting on it.
                self.inner.remove_if(&key, |_, current| {
                    Arc::ptr_eq(current, &slot)
                        && current.cell.get().is_none()
                        && Arc::strong_count(current) == 2
                });
                Err(e)
            }
        }
    }

    /// Current slot for `key`, replacing an expired one.
    fn live_slot(&self, key: &K) -> Arc<Slot<V>> {
        loop {
            let slot = self
                .inner
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Slot::new()))
                .clone();
            if !slot.is_expired(Instant::now()) {
                return slot;
            }
            // Only evict the slot we saw; a concurrent caller may have replaced it.
            self.inner.remove_if(key, |_, current| Arc::ptr_eq(current, &slot));
        }
    }

    /// Cached, unexpired value for `key`.
    pub fn get(&self, key: &K) -> Option<V> {
        let slot = self.inner.get(key)?;
        let stored = slot.cell.get()?;
        (stored.expires_at > Instant::now()).then(|| stored.value.clone())
    }

    pub fn invalidate(&self, key: &K) {
        self.inner.remove(key);
    }

    /// Drop every expired entry, and every empty one nobody is computing.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, slot| {
            let abandoned = slot.cell.get().is_none() && Arc::strong_count(slot) == 1;
            !(abandoned || slot.is_expired(now))
        });
        before.saturating_sub(self.inner.len())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
