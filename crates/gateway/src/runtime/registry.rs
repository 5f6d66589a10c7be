//! Keyed, lazily built instance cache with single-flight construction.
//!
//! Concurrent first requests for one key share a single construction
//! attempt and all observe its outcome, success or failure. Requests for
//! other keys never wait on it. A failed attempt is dropped from the map
//! before its waiters wake, so the next request tries again.

use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;

type Attempt<T, E> = Arc<OnceCell<Result<T, E>>>;

pub struct AgentRegistry<T, E = Infallible> {
    slots: Mutex<HashMap<String, Attempt<T, E>>>,
}

impl<T, E> Default for AgentRegistry<T, E> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone, E: Clone> AgentRegistry<T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the instance for `key`, building it with `factory` on first use.
    pub async fn get_or_create<F, Fut>(&self, key: &str, factory: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let attempt = {
            let mut slots = self.slots.lock();
            slots.entry(key.to_owned()).or_default().clone()
        };
        attempt
            .get_or_init(|| async {
                let outcome = factory().await;
                if outcome.is_err() {
                    let mut slots = self.slots.lock();
                    if slots.get(key).is_some_and(|a| Arc::ptr_eq(a, &attempt)) {
                        slots.remove(key);
                    }
                }
                outcome
            })
            .await
            .clone()
    }

    /// The instance for `key` if it has been built.
    pub fn get(&self, key: &str) -> Option<T> {
        self.slots
            .lock()
            .get(key)
            .and_then(|a| a.get().and_then(|r| r.as_ref().ok().cloned()))
    }

    /// Number of keys with a built instance.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|a| matches!(a.get(), Some(Ok(_))))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_first_calls_build_once() {
        let registry = Arc::new(AgentRegistry::<usize, String>::new());
        let builds = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            let builds = builds.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .get_or_create("model-a", || async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, String>(builds.fetch_add(1, Ordering::SeqCst) + 100)
                    })
                    .await
            }));
        }

        for h in handles {
            assert_eq!(h.await.unwrap().unwrap(), 100);
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_block_each_other() {
        let registry = Arc::new(AgentRegistry::<&'static str, String>::new());
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let slow = {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry
                    .get_or_create("slow", || async move {
                        let _ = release_rx.await;
                        Ok::<_, String>("slow")
                    })
                    .await
            })
        };

        // Let the slow construction start and park.
        tokio::task::yield_now().await;

        let fast = tokio::time::timeout(
            Duration::from_secs(1),
            registry.get_or_create("fast", || async { Ok::<_, String>("fast") }),
        )
        .await
        .expect("fast key must not wait on slow key");
        assert_eq!(fast.unwrap(), "fast");
        assert!(registry.get("slow").is_none());

        release_tx.send(()).unwrap();
        assert_eq!(slow.await.unwrap().unwrap(), "slow");
        assert_eq!(registry.get("slow"), Some("slow"));
    }

    #[tokio::test]
    async fn failed_construction_is_retried() {
        let registry = AgentRegistry::<u32, String>::new();
        let first = registry
            .get_or_create("k", || async { Err::<u32, _>("boom".to_string()) })
            .await;
        assert_eq!(first.unwrap_err(), "boom");
        assert!(registry.is_empty());

        let second = registry.get_or_create("k", || async { Ok::<_, String>(7) }).await;
        assert_eq!(second.unwrap(), 7);
    }

    #[tokio::test]
    async fn concurrent_failed_first_calls_share_one_attempt() {
        let registry = Arc::new(AgentRegistry::<u32, String>::new());
        let builds = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let registry = registry.clone();
            let builds = builds.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .get_or_create("k", || async move {
                        builds.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Err::<u32, _>("boom".to_string())
                    })
                    .await
            }));
        }

        for h in handles {
            assert_eq!(h.await.unwrap().unwrap_err(), "boom");
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());

        let retried = registry.get_or_create("k", || async { Ok::<_, String>(9) }).await;
        assert_eq!(retried.unwrap(), 9);
    }
}
