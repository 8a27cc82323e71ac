//! In-flight operation registry
//!
//! Coalesces concurrent identical operations: the first caller for a key
//! spawns the work, later callers for the same key await the same shared
//! outcome. The entry is dropped when the work finishes, whatever the
//! outcome, so the next caller after a failure starts a fresh attempt.
//!
//! The work runs on its own task, so a caller that stops waiting does not
//! cancel it for the others.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

use super::{DocumentError, DocumentResult};

type SharedResult<T> = Shared<BoxFuture<'static, DocumentResult<T>>>;

/// Concurrency-safe map from operation key to a single shared result
pub struct InFlight<T: Clone> {
    pending: Arc<Mutex<HashMap<String, SharedResult<T>>>>,
}

impl<T: Clone> Clone for InFlight<T> {
    fn clone(&self) -> Self {
        Self {
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<T: Clone> Default for InFlight<T> {
    fn default() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

/// Removes a key from the registry when the owning task ends, including
/// when the work panics
struct ClearOnDrop<T: Clone> {
    registry: Arc<Mutex<HashMap<String, SharedResult<T>>>>,
    key: String,
}

impl<T: Clone> Drop for ClearOnDrop<T> {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.key);
    }
}

impl<T> InFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `op` for `key`, or join the execution already running for it.
    ///
    /// `op` is only called when no execution for `key` is in flight.
    pub async fn run<F, Fut>(&self, key: &str, op: F) -> DocumentResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DocumentResult<T>> + Send + 'static,
    {
        let shared = {
            let mut pending = self.pending.lock();
            match pending.get(key) {
                Some(existing) => {
                    tracing::debug!(key = %key, "Joining in-flight operation");
                    existing.clone()
                }
                None => {
                    let registry = Arc::clone(&self.pending);
                    let owned_key = key.to_string();
                    let work = op();

                    // The lock is held until the entry is inserted, so the
                    // guard's removal can never run ahead of the insert.
                    let handle = tokio::spawn(async move {
                        let _clear = ClearOnDrop {
                            registry,
                            key: owned_key,
                        };
                        work.await
                    });

                    let shared = async move {
                        handle
                            .await
                            .map_err(DocumentError::from)
                            .and_then(|result| result)
                    }
                    .boxed()
                    .shared();

                    pending.insert(key.to_string(), shared.clone());
                    shared
                }
            }
        };

        shared.await
    }

    /// Number of operations currently in flight
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pending.lock().contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_execution() {
        let registry: InFlight<u32> = InFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                registry
                    .run("key", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(42)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_entry_cleared() {
        let registry: InFlight<u32> = InFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = {
            let calls = Arc::clone(&calls);
            registry.run("key", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(30)).await;
                Err(DocumentError::ExternalTool("boom".to_string()))
            })
        };
        let second = registry.run("key", || async { Ok(1) });

        let (a, b) = tokio::join!(first, second);
        assert!(matches!(a, Err(DocumentError::ExternalTool(_))));
        assert!(matches!(b, Err(DocumentError::ExternalTool(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!registry.contains("key"));

        // Next caller gets a fresh attempt
        let retry = registry.run("key", || async { Ok(7) }).await;
        assert_eq!(retry.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_panicking_work_clears_entry() {
        let registry: InFlight<u32> = InFlight::new();

        let result = registry
            .run("key", || async { panic!("rasterizer crashed") })
            .await;
        assert!(matches!(result, Err(DocumentError::Internal(_))));
        assert!(!registry.contains("key"));

        let retry = registry.run("key", || async { Ok(7) }).await;
        assert_eq!(retry.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_distinct_keys_run_independently() {
        let registry: InFlight<&'static str> = InFlight::new();
        let (a, b) = tokio::join!(
            registry.run("a", || async { Ok("a") }),
            registry.run("b", || async { Ok("b") }),
        );
        assert_eq!(a.unwrap(), "a");
        assert_eq!(b.unwrap(), "b");
    }

    #[tokio::test]
    async fn test_abandoned_caller_does_not_cancel_work() {
        let registry: InFlight<u32> = InFlight::new();
        let finished = Arc::new(AtomicUsize::new(0));

        let abandoned = {
            let finished = Arc::clone(&finished);
            registry.run("key", || async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
        };
        let _ = tokio::time::timeout(Duration::from_millis(5), abandoned).await;

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }
}
