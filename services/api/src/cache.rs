//! services/api/src/cache.rs
//!
//! A generic single-slot TTL cache used to share one snapshot of upstream
//! data between many concurrent callers.
//!
//! The slot is guarded by an async mutex that stays held across the loader
//! call, so at most one refresh is ever in flight: callers arriving during a
//! refresh queue on the lock and then observe the freshly stored value
//! instead of issuing their own upstream request. A failed refresh leaves the
//! slot in its prior state; an expired value is never served as a fallback.

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Single-slot cache holding the last loaded value and its fetch time.
pub struct SnapshotCache<T> {
    ttl: Duration,
    slot: Mutex<Option<Snapshot<T>>>,
}

struct Snapshot<T> {
    value: T,
    fetched_at: Instant,
}

impl<T: Clone> SnapshotCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Returns the cached value if it is still fresh, otherwise invokes
    /// `loader`, stores its result, and returns it.
    ///
    /// The lock is held for the duration of the load, which serializes
    /// refreshes. If the loader fails, the error goes to the caller of that
    /// cycle and the previous snapshot (if any) stays in place for the next
    /// call.
    pub async fn get<F, Fut, E>(&self, loader: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(snapshot) = slot.as_ref() {
            if snapshot.fetched_at.elapsed() < self.ttl {
                return Ok(snapshot.value.clone());
            }
        }

        let value = loader().await?;
        *slot = Some(Snapshot {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn second_call_within_ttl_hits_the_cache() {
        let cache = SnapshotCache::<u32>::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value = cache
                .get(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_value_triggers_a_reload() {
        let cache = SnapshotCache::<u32>::new(Duration::ZERO);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            cache
                .get(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(7)
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_load() {
        let cache = Arc::new(SnapshotCache::<u32>::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .get(|| async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            // Keep the load in flight long enough for every
                            // task to have arrived.
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok::<_, String>(42)
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_load_propagates_and_caches_nothing() {
        let cache = SnapshotCache::<u32>::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        let err = cache
            .get(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>("upstream exploded".to_string())
            })
            .await
            .unwrap_err();
        assert_eq!(err, "upstream exploded");

        // The failure was not cached; the next call loads again and succeeds.
        let value = cache
            .get(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(9)
            })
            .await
            .unwrap();
        assert_eq!(value, 9);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
